// Crate-wide error type.
//
// Validation problems are not errors: they are returned as data by
// `Engine::validate`. This enum only covers I/O, parsing and the formula
// graph failing to build.
use crate::metric::Metric;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    #[error("unknown depot category: {0} (expected Rural or Urban)")]
    UnknownCategory(String),

    #[error("unknown benchmark indicator: {0}")]
    UnknownIndicator(String),

    #[error("invalid date (row {row}): {value}")]
    InvalidDate { row: usize, value: String },

    #[error("missing column: {0}")]
    MissingColumn(&'static str),

    #[error("formula dependency cycle among: {}", join(.0))]
    CycleDetected(Vec<Metric>),

    #[error("metric {0} is computed by more than one formula")]
    DuplicateFormula(Metric),

    #[error("metric {0} is a raw input and cannot be a formula target")]
    DerivedTargetRequired(Metric),

    #[error("no record for depot {depot} on {date}")]
    RecordNotFound {
        depot: String,
        date: chrono::NaiveDate,
    },
}

fn join(metrics: &[Metric]) -> String {
    metrics
        .iter()
        .map(|m| m.column())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
