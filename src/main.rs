// Entry point and high-level CLI flow.
//
// - Option [1] loads the depot sheet and category table, merges each row
//   into the store (recomputing and validating the merged record) and keeps
//   the valid ones.
// - Option [2] builds the ratio reports for a chosen period, a monthly
//   rollup and a JSON summary.
// - After generating reports, the user can go back to the menu or exit.
use depot_kpi::aggregate::{self, Aggregate, Granularity, Period};
use depot_kpi::benchmark::CategoryIndex;
use depot_kpi::config::{AppConfig, DEFAULT_CONFIG_PATH};
use depot_kpi::store::{
    apply_entry, entry_date_allowed, next_entry_date, InMemoryStore, RecordStore, Upsert,
};
use depot_kpi::{loader, logging, output, reports, util, Engine, Metric, ValidationError};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

// Loaded state survives between menu choices so reports can be generated
// several times from one load.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        store: InMemoryStore::new(),
        categories: CategoryIndex::new(),
        rejected: 0,
    })
});

struct AppState {
    store: InMemoryStore,
    categories: CategoryIndex,
    rejected: usize,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn prompt_granularity() -> Granularity {
    println!("Select period:");
    println!("[1] Daily");
    println!("[2] Monthly");
    println!("[3] Quarterly");
    println!("[4] Yearly\n");
    loop {
        match read_choice().as_str() {
            "1" => return Granularity::Daily,
            "2" => return Granularity::Monthly,
            "3" => return Granularity::Quarterly,
            "4" => return Granularity::Yearly,
            _ => println!("Invalid choice. Please enter 1-4."),
        }
    }
}

/// Handle option [1]: load, compute and validate the depot sheet.
fn handle_load(config: &AppConfig, engine: &Engine) {
    let editable = match config.editable() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Bad editable_fields in configuration: {}\n", e);
            return;
        }
    };
    let categories = match loader::load_categories(&config.categories_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", config.categories_path, e);
            return;
        }
    };
    let (mut records, load_report) = match loader::load_records(&config.inputs_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", config.inputs_path, e);
            return;
        }
    };
    println!(
        "Processing depot sheet... ({} rows read, {} loaded, {} depots categorised)",
        util::format_int(load_report.total_rows as i64),
        util::format_int(load_report.loaded_rows as i64),
        util::format_int(categories.len() as i64)
    );
    if load_report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to a missing depot or unreadable date.",
            util::format_int(load_report.parse_errors as i64)
        );
    }

    // Entry dates only advance one day at a time, so rows go in date order.
    records.sort_by_key(|r| r.date);
    let today = chrono::Local::now().date_naive();
    let mut app = state();
    let mut accepted = 0usize;
    let mut updated = 0usize;
    let mut rejected = 0usize;
    let mut problems: Vec<ValidationError> = Vec::new();
    for record in records {
        let Some(category) = categories.category_of(&record.depot) else {
            warn!(depot = %record.depot, date = %record.date, "no category on file, record skipped");
            rejected += 1;
            continue;
        };
        if !entry_date_allowed(&app.store, &record.depot, record.date, today) {
            warn!(
                depot = %record.depot,
                date = %record.date,
                next = %next_entry_date(&app.store, &record.depot, today),
                "record dated past the next entry date, skipped"
            );
            rejected += 1;
            continue;
        }
        let (depot, date) = record.key();
        match apply_entry(engine, &mut app.store, record, category, &editable) {
            Ok(Upsert::Inserted) => accepted += 1,
            Ok(Upsert::Updated) => updated += 1,
            Err(errors) => {
                warn!(%depot, %date, errors = errors.len(), "record rejected");
                rejected += 1;
                problems.extend(errors);
            }
        }
    }
    app.categories = categories;
    app.rejected += rejected;

    info!(accepted, updated, rejected, "depot sheet processed");
    println!(
        "Saved {} new and {} updated records; {} rejected.",
        util::format_int(accepted as i64),
        util::format_int(updated as i64),
        util::format_int(rejected as i64)
    );
    if !problems.is_empty() {
        println!("\nValidation errors (first 10 of {}):\n", problems.len());
        output::preview_table_rows(&problems, 10);
    }

    let file = config.output_path("computed_records.csv");
    match output::write_records(&file, &app.store.all()) {
        Ok(()) => println!("(Computed records exported to {})\n", file.display()),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

/// Handle option [2]: ratio reports for the period holding the latest data.
fn handle_generate_reports(config: &AppConfig) {
    let (records, categories, rejected) = {
        let app = state();
        (app.store.all(), app.categories.clone(), app.rejected)
    };
    let Some(latest) = records.iter().map(|r| r.date).max() else {
        println!("Error: No data loaded. Please load the depot sheet first (option 1).\n");
        return;
    };

    let period = Period::containing(prompt_granularity(), latest);
    let in_scope = aggregate::in_period(&records, &period);
    println!(
        "\nGenerating reports for {} ({} records)...\n",
        period,
        util::format_int(in_scope.len() as i64)
    );

    let mut report_no = 1;
    let mut depots: Vec<&str> = in_scope.iter().map(|r| r.depot.as_str()).collect();
    depots.sort_unstable();
    depots.dedup();
    let mut depot_rows = Vec::new();
    for depot in depots {
        let Some(category) = categories.category_of(depot) else {
            continue;
        };
        let Some(ratios) =
            aggregate::depot_ratios(&records, depot, category, period, &config.benchmarks)
        else {
            continue;
        };
        let rows = reports::depot_ratio_rows(&ratios);
        let note = format!(
            "{} depot, {} days considered",
            ratios.category, ratios.days_considered
        );
        output::preview_table(
            report_no,
            &format!("{} Ratios, {}", ratios.depot, period),
            Some(note.as_str()),
            &rows,
            rows.len(),
        );
        report_no += 1;
        depot_rows.extend(rows);
    }
    let depot_file = config.output_path("report_depot_ratios.csv");
    if let Err(e) = output::write_csv(&depot_file, &depot_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("(Depot ratios exported to {})\n", depot_file.display());

    let region = aggregate::region_ratios(&records, &categories, period, &config.benchmarks);
    let region_rows = reports::region_ratio_rows(&region);
    let region_file = config.output_path("report_region_ratios.csv");
    if let Err(e) = output::write_csv(&region_file, &region_rows) {
        eprintln!("Write error: {}", e);
    }
    output::preview_table(
        report_no,
        "Region Ratios",
        Some(format!("{} depots, {}", region.depots.len(), period).as_str()),
        &region_rows,
        12,
    );
    println!("(Full table exported to {})\n", region_file.display());
    report_no += 1;

    let mut rollup_rows = reports::rollup_rows(
        Metric::ActualKm,
        Aggregate::Sum,
        &aggregate::rollup(&records, Metric::ActualKm, Granularity::Monthly, Aggregate::Sum),
    );
    rollup_rows.extend(reports::rollup_rows(
        Metric::KmPerDriver,
        Aggregate::Mean,
        &aggregate::rollup(&records, Metric::KmPerDriver, Granularity::Monthly, Aggregate::Mean),
    ));
    let rollup_file = config.output_path("report_monthly_rollup.csv");
    if let Err(e) = output::write_csv(&rollup_file, &rollup_rows) {
        eprintln!("Write error: {}", e);
    }
    output::preview_table(
        report_no,
        "Monthly Rollup",
        Some("Actual KM summed, KM/Driver averaged"),
        &rollup_rows,
        6,
    );
    println!("(Full table exported to {})\n", rollup_file.display());

    let summary = reports::generate_summary(&records, rejected);
    let summary_file = config.output_path("summary.json");
    if let Err(e) = output::write_json(&summary_file, &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats ({}):", summary_file.display());
    println!(
        "{{\"total_records\": {}, \"avg_km_per_driver\": {}, \"total_driver_shortage\": {}}}\n",
        util::format_int(summary.total_records as i64),
        util::format_optional(summary.avg_km_per_driver, 2),
        util::format_number(summary.total_driver_shortage, 0)
    );
}

fn main() {
    logging::init();

    let config = match AppConfig::load_or_default(DEFAULT_CONFIG_PATH) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "configuration could not be read");
            eprintln!("Failed to read {}: {}", DEFAULT_CONFIG_PATH, e);
            std::process::exit(1);
        }
    };
    let engine = match Engine::new() {
        Ok(e) => e,
        Err(e) => {
            error!(error = %e, "formula set rejected");
            std::process::exit(1);
        }
    };

    loop {
        println!("Depot KPI Dashboard:");
        println!("[1] Load the depot sheet");
        println!("[2] Generate Reports\n");
        match read_choice().as_str() {
            "1" => {
                handle_load(&config, &engine);
            }
            "2" => {
                println!();
                handle_generate_reports(&config);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
