use crate::error::Result;
use crate::metric::{Metric, MetricRecord};
use crate::util::format_cell;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Computed records, one per row: depot, date, every metric column in sheet
/// order, then any pass-through columns sorted by name.
pub fn write_records(path: impl AsRef<Path>, records: &[MetricRecord]) -> Result<()> {
    let known: BTreeSet<&str> = Metric::ALL.iter().map(|m| m.column()).collect();
    let extra: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.values.keys().map(String::as_str))
        .filter(|k| !known.contains(k))
        .collect();
    let columns: Vec<&str> = Metric::ALL
        .iter()
        .map(|m| m.column())
        .chain(extra.iter().copied())
        .collect();

    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["depot_name", "data_date"];
    header.extend(columns.iter().copied());
    wtr.write_record(&header)?;
    for r in records {
        let mut row = vec![r.depot.clone(), r.date.format("%Y-%m-%d").to_string()];
        row.extend(
            columns
                .iter()
                .map(|c| format_cell(r.values.get(*c).copied().flatten())),
        );
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn preview_table<T>(report_no: usize, title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\nReport {}: {}", report_no, title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    preview_table_rows(rows, max_rows);
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
