// Sheet on disk → computed, validated, stored records → ratio reports.
use chrono::NaiveDate;
use depot_kpi::aggregate::{self, Aggregate, Granularity, Period};
use depot_kpi::config::AppConfig;
use depot_kpi::benchmark::CategoryIndex;
use depot_kpi::store::{apply_entry, InMemoryStore, RecordStore, Upsert};
use depot_kpi::{loader, output, reports, DepotCategory, EditableFields, Engine, Indicator, Metric};
use std::collections::BTreeSet;
use std::path::Path;

const CATEGORIES: &str = "\
zone,region,depot_name,category
Z1,Warangal,Jangaon,Rural
Z1,Secunderabad,Miyapur,Urban
";

/// Off Cancellation is left off the first sheet and filled in later.
fn sheet_inputs() -> impl Iterator<Item = Metric> {
    Metric::inputs().filter(|m| *m != Metric::OffCancellation)
}

fn sheet_row(depot: &str, date: &str, total_drivers: u32, sick_leave: u32, flu_fever: u32) -> String {
    let mut cells = vec![depot.to_string(), date.to_string()];
    for metric in sheet_inputs() {
        let value = match metric {
            Metric::Schedules | Metric::PlannedSchedules => 40,
            Metric::SchedulesServices | Metric::PlannedServices | Metric::ActualServices => 50,
            Metric::SchedulesKms | Metric::PlannedKm | Metric::ActualKm => 6000,
            Metric::TotalDrivers => total_drivers,
            Metric::DriversRequired => 80,
            Metric::WeeklyOff => 10,
            Metric::SickLeave => sick_leave,
            Metric::FluFever => flu_fever,
            _ => 0,
        };
        cells.push(value.to_string());
    }
    cells.join(",")
}

fn sheet() -> String {
    let mut header = vec!["depot_name".to_string(), "data_date".to_string()];
    header.extend(sheet_inputs().map(|m| m.column().to_string()));
    let rows = [
        sheet_row("Miyapur", "2025-05-01", 100, 2, 2),
        sheet_row("Miyapur", "2025-05-02", 100, 4, 4),
        sheet_row("Jangaon", "2025-05-01", 80, 1, 1),
        // Sick-leave reasons do not add up to the total.
        sheet_row("Jangaon", "2025-05-02", 80, 3, 2),
        // Not in the category table.
        sheet_row("Kazipet", "2025-05-01", 60, 0, 0),
    ];
    let mut text = header.join(",");
    for row in rows {
        text.push('\n');
        text.push_str(&row);
    }
    text.push('\n');
    text
}

struct Loaded {
    engine: Engine,
    categories: CategoryIndex,
    store: InMemoryStore,
    rejected: usize,
}

/// Push every row of the sheet at `path` through `apply_entry`; returns the
/// number of rows refused.
fn apply_sheet(
    engine: &Engine,
    categories: &CategoryIndex,
    store: &mut InMemoryStore,
    path: &Path,
    editable: &EditableFields,
) -> usize {
    let (records, _) = loader::load_records(path).unwrap();
    let mut rejected = 0;
    for record in records {
        let Some(category) = categories.category_of(&record.depot) else {
            rejected += 1;
            continue;
        };
        if apply_entry(engine, store, record, category, editable).is_err() {
            rejected += 1;
        }
    }
    rejected
}

fn load(dir: &Path) -> Loaded {
    depot_kpi::logging::init_test();
    let inputs = dir.join("depot_inputs.csv");
    let categories_path = dir.join("depot_categories.csv");
    std::fs::write(&inputs, sheet()).unwrap();
    std::fs::write(&categories_path, CATEGORIES).unwrap();

    let engine = Engine::new().unwrap();
    let categories = loader::load_categories(&categories_path).unwrap();
    let first_sheet: BTreeSet<Metric> = [Metric::OffCancellation].into_iter().collect();
    let editable = EditableFields::default().without(&first_sheet);
    let mut store = InMemoryStore::new();
    let rejected = apply_sheet(&engine, &categories, &mut store, &inputs, &editable);
    Loaded {
        engine,
        categories,
        store,
        rejected,
    }
}

#[test]
fn invalid_and_uncategorised_rows_are_not_stored() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load(dir.path());
    assert_eq!(loaded.store.len(), 3);
    assert_eq!(loaded.rejected, 2);
    assert_eq!(loaded.store.depots(), vec!["Jangaon".to_string(), "Miyapur".to_string()]);

    let stored = loaded
        .store
        .get("Miyapur", NaiveDate::from_ymd_opt(2025, 5, 2).unwrap())
        .unwrap();
    assert_eq!(stored.get(Metric::PctSickLeave), Some(4.0));
    assert_eq!(stored.get(Metric::AvailableDrivers2), Some(86.0));
}

#[test]
fn depot_and_region_reports() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load(dir.path());
    let records = loaded.store.all();
    let config = AppConfig::default();
    let period = Period::containing(
        Granularity::Monthly,
        NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
    );
    assert_eq!(aggregate::in_period(&records, &period).len(), 3);

    let ratios = aggregate::depot_ratios(
        &records,
        "Miyapur",
        DepotCategory::Urban,
        period,
        &config.benchmarks,
    )
    .unwrap();
    assert_eq!(ratios.days_considered, 2);
    assert_eq!(ratios.planned_schedules, 80.0);
    assert_eq!(ratios.drivers_per_schedule, 2.5);
    let sick = ratios.comparison(Indicator::SickLeave).unwrap();
    assert_eq!(sick.actual, Some(3.0));
    assert_eq!(sick.variance, Some(1.0));

    let rows = reports::depot_ratio_rows(&ratios);
    assert_eq!(rows.len(), 11);
    assert!(rows.iter().all(|r| r.depot == "Miyapur"));
    let weekly = rows.iter().find(|r| r.metric == "Weekly Off (%)").unwrap();
    assert_eq!(weekly.actual, "10.00");
    assert_eq!(weekly.status, "OK");

    let mut categories = CategoryIndex::new();
    categories.insert("Miyapur", DepotCategory::Urban);
    categories.insert("Jangaon", DepotCategory::Rural);
    let region = aggregate::region_ratios(&records, &categories, period, &config.benchmarks);
    assert_eq!(region.depots.len(), 2);
    let region_rows = reports::region_ratio_rows(&region);
    assert_eq!(region_rows.len(), 2 * 9 + 11);
    assert_eq!(region_rows.last().unwrap().depot, "REGION");

    let file = dir.path().join("report_region_ratios.csv");
    output::write_csv(&file, &region_rows).unwrap();
    let text = std::fs::read_to_string(&file).unwrap();
    assert!(text.starts_with("Depot,Category,Metric,Benchmark,Actual,Variance"));
}

#[test]
fn rollup_summary_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load(dir.path());
    let records = loaded.store.all();

    let buckets = aggregate::rollup(&records, Metric::ActualKm, Granularity::Daily, Aggregate::Sum);
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].value, Some(12000.0));
    assert_eq!(buckets[0].records, 2);
    let rows = reports::rollup_rows(Metric::ActualKm, Aggregate::Sum, &buckets);
    assert_eq!(rows[0].period, "01-May-2025");
    assert_eq!(rows[1].value, "6,000.00");

    let summary = reports::generate_summary(&records, loaded.rejected);
    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.total_depots, 2);
    assert_eq!(summary.rejected_records, 2);
    assert_eq!(summary.last_date.as_deref(), Some("2025-05-02"));

    let computed = dir.path().join("computed_records.csv");
    output::write_records(&computed, &records).unwrap();
    let (reloaded, report) = loader::load_records(&computed).unwrap();
    assert!(report.unknown_columns.is_empty());
    assert_eq!(reloaded.len(), 3);
    assert_eq!(reloaded[0].get(Metric::KmPerDriver), records[0].get(Metric::KmPerDriver));
}

#[test]
fn second_sheet_edits_without_touching_locked_cells() {
    let dir = tempfile::tempdir().unwrap();
    let mut loaded = load(dir.path());
    let day = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
    assert_eq!(loaded.store.get("Miyapur", day).unwrap().get(Metric::OffCancellation), None);

    let edits = dir.path().join("depot_edits.csv");
    std::fs::write(
        &edits,
        "depot_name,data_date,Total Drivers,Off Cancellation,KM/Driver\nMiyapur,2025-05-02,150,2,1\n",
    )
    .unwrap();
    let rejected = apply_sheet(
        &loaded.engine,
        &loaded.categories,
        &mut loaded.store,
        &edits,
        &EditableFields::default(),
    );
    assert_eq!(rejected, 0);
    assert_eq!(loaded.store.len(), 3);

    let stored = loaded.store.get("Miyapur", day).unwrap();
    assert_eq!(stored.get(Metric::TotalDrivers), Some(100.0));
    assert_eq!(stored.get(Metric::OffCancellation), Some(2.0));
    assert_eq!(stored.get(Metric::DriversOnDuty), Some(88.0));
    // 6000 / 88 = 68.2
    assert_eq!(stored.get(Metric::KmPerDriver), Some(68.0));
    assert_eq!(
        stored.values,
        loaded.engine.compute(&stored.values, DepotCategory::Urban)
    );
}

#[test]
fn invalid_edit_is_refused_whole() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load(dir.path());
    let mut store = loaded.store.clone();
    let day = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
    let before = store.get("Jangaon", day).cloned();

    let mut edit = depot_kpi::MetricRecord::new("Jangaon", day);
    edit.set(Metric::OffCancellation, Some(-2.0));
    let outcome = apply_entry(
        &loaded.engine,
        &mut store,
        edit,
        DepotCategory::Rural,
        &EditableFields::default(),
    );
    let errors = outcome.unwrap_err();
    assert_eq!(errors[0].field, "Off_Cancellation");
    assert_eq!(store.get("Jangaon", day).cloned(), before);

    let mut fill = depot_kpi::MetricRecord::new("Jangaon", day);
    fill.set(Metric::OffCancellation, Some(0.0));
    let outcome = apply_entry(
        &loaded.engine,
        &mut store,
        fill,
        DepotCategory::Rural,
        &EditableFields::default(),
    );
    assert_eq!(outcome, Ok(Upsert::Updated));
}
