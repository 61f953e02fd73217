use crate::benchmark::{CategoryIndex, DepotCategory};
use crate::error::{Error, Result};
use crate::metric::{Metric, MetricMap, MetricRecord};
use crate::types::DepotRow;
use crate::util::{parse_date_safe, parse_f64_safe};
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    /// Non-blank cells that did not read as a number.
    pub bad_cells: usize,
    /// Headers that are not a known metric; their cells pass through as-is.
    pub unknown_columns: Vec<String>,
}

/// Where each CSV column goes.
enum Column {
    Depot,
    Date,
    Value(String),
}

fn classify(header: &str) -> (Column, bool) {
    let h = header.trim();
    if ["depot_name", "depot"].iter().any(|k| h.eq_ignore_ascii_case(k)) {
        return (Column::Depot, true);
    }
    if ["data_date", "date"].iter().any(|k| h.eq_ignore_ascii_case(k)) {
        return (Column::Date, true);
    }
    match Metric::from_key(h) {
        Some(metric) => (Column::Value(metric.column().to_string()), true),
        None => (Column::Value(h.to_string()), false),
    }
}

/// Load daily depot sheets from a CSV file. See `read_records`.
pub fn load_records(path: impl AsRef<Path>) -> Result<(Vec<MetricRecord>, LoadReport)> {
    let file = std::fs::File::open(path.as_ref())?;
    let loaded = read_records(file)?;
    info!(
        path = %path.as_ref().display(),
        rows = loaded.1.total_rows,
        loaded = loaded.1.loaded_rows,
        "depot sheet loaded"
    );
    Ok(loaded)
}

/// One record per CSV row. Headers may be storage columns or grid labels;
/// `depot_name` and `data_date` are required. Rows without a depot or with an
/// unreadable date are skipped and counted. Blank cells become `None`; cells
/// that are present but not numeric become NaN so validation reports them.
pub fn read_records<R: Read>(reader: R) -> Result<(Vec<MetricRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut report = LoadReport::default();
    let columns: Vec<Column> = headers
        .iter()
        .map(|h| {
            let (column, known) = classify(h);
            if !known {
                report.unknown_columns.push(h.trim().to_string());
            }
            column
        })
        .collect();
    if !columns.iter().any(|c| matches!(c, Column::Depot)) {
        return Err(Error::MissingColumn("depot_name"));
    }
    if !columns.iter().any(|c| matches!(c, Column::Date)) {
        return Err(Error::MissingColumn("data_date"));
    }
    if !report.unknown_columns.is_empty() {
        warn!(columns = ?report.unknown_columns, "unrecognised columns passed through");
    }

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        report.total_rows += 1;
        let row: StringRecord = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row = idx + 2, error = %e, "unreadable row skipped");
                report.parse_errors += 1;
                continue;
            }
        };

        let mut depot: Option<String> = None;
        let mut date = None;
        let mut date_text = String::new();
        let mut values = MetricMap::new();
        for (column, cell) in columns.iter().zip(row.iter()) {
            match column {
                Column::Depot => {
                    let name = cell.trim();
                    if !name.is_empty() {
                        depot = Some(name.to_string());
                    }
                }
                Column::Date => {
                    date_text = cell.trim().to_string();
                    date = parse_date_safe(Some(cell));
                }
                Column::Value(key) => {
                    let value = if cell.trim().is_empty() {
                        None
                    } else {
                        match parse_f64_safe(Some(cell)) {
                            Some(v) => Some(v),
                            None => {
                                report.bad_cells += 1;
                                Some(f64::NAN)
                            }
                        }
                    };
                    values.insert(key.clone(), value);
                }
            }
        }

        let Some(depot) = depot else {
            warn!(row = idx + 2, "row without depot name skipped");
            report.parse_errors += 1;
            continue;
        };
        let Some(date) = date else {
            let err = Error::InvalidDate {
                row: idx + 2,
                value: date_text,
            };
            warn!(%err, "row skipped");
            report.parse_errors += 1;
            continue;
        };
        records.push(MetricRecord {
            depot,
            date,
            values,
        });
    }

    report.loaded_rows = records.len();
    Ok((records, report))
}

/// Load the depot → category reference table. See `read_categories`.
pub fn load_categories(path: impl AsRef<Path>) -> Result<CategoryIndex> {
    let file = std::fs::File::open(path.as_ref())?;
    let (index, skipped) = read_categories(file)?;
    info!(
        path = %path.as_ref().display(),
        depots = index.len(),
        skipped,
        "depot categories loaded"
    );
    Ok(index)
}

/// Rows with a missing depot or an unknown category are skipped and counted.
pub fn read_categories<R: Read>(reader: R) -> Result<(CategoryIndex, usize)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut index = CategoryIndex::new();
    let mut skipped = 0usize;

    for result in rdr.deserialize::<DepotRow>() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "unreadable depot row skipped");
                skipped += 1;
                continue;
            }
        };
        let depot = match row.depot_name.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => {
                skipped += 1;
                continue;
            }
        };
        match row.category.as_deref().unwrap_or("").parse::<DepotCategory>() {
            Ok(category) => {
                debug!(
                    depot = %depot,
                    %category,
                    zone = row.zone.as_deref().unwrap_or(""),
                    region = row.region.as_deref().unwrap_or(""),
                    "depot category"
                );
                index.insert(&depot, category);
            }
            Err(e) => {
                warn!(depot = %depot, error = %e, "depot skipped");
                skipped += 1;
            }
        }
    }
    Ok((index, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SHEET: &str = "\
depot_name,data_date,Total Drivers,Sick_Leave,KM/Driver,Remarks
Miyapur,2025-07-01,\"1,200\",4,,x
Miyapur,02-07-2025,90,n/a,74,
,2025-07-03,90,4,,
Jangaon,someday,90,4,,
";

    #[test]
    fn reads_labels_and_columns() {
        let (records, report) = read_records(SHEET.as_bytes()).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.parse_errors, 2);
        assert_eq!(report.unknown_columns, vec!["Remarks".to_string()]);

        let first = &records[0];
        assert_eq!(first.depot, "Miyapur");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(first.get(Metric::TotalDrivers), Some(1200.0));
        assert_eq!(first.get(Metric::KmPerDriver), None);
        assert!(first.values.get("Remarks").unwrap().unwrap().is_nan());

        let second = &records[1];
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2025, 7, 2).unwrap());
        assert!(second.get(Metric::SickLeave).unwrap().is_nan());
        assert_eq!(report.bad_cells, 2);
    }

    #[test]
    fn sheet_needs_depot_and_date() {
        let err = read_records("Total Drivers\n90\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn("depot_name")));
        let err = read_records("depot_name,Total Drivers\nA,90\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn("data_date")));
    }

    #[test]
    fn reads_categories() {
        let csv = "zone,region,depot_name,category\nZ1,R1,Miyapur,URBAN\nZ1,R1,Jangaon,rural\nZ1,R1,Kazipet,Metro\nZ1,R1,,Rural\n";
        let (index, skipped) = read_categories(csv.as_bytes()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(skipped, 2);
        assert_eq!(index.category_of("miyapur"), Some(DepotCategory::Urban));
        assert_eq!(index.category_of("Jangaon"), Some(DepotCategory::Rural));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inputs.csv");
        std::fs::write(&path, SHEET).unwrap();
        let (records, _) = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert!(load_records(dir.path().join("missing.csv")).is_err());
    }
}
