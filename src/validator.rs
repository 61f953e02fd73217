// Field-level validation of a computed depot record.
//
// Validation never fails and never edits the record: every problem found is
// returned as a `ValidationError` and the caller decides whether to persist.
use crate::engine::formula::{mu_reason_total, operand, sl_reason_total};
use crate::error::Result;
use crate::metric::{get, Metric, MetricMap};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use tabled::Tabled;

/// Schedule and service counts, and Total Drivers.
pub const COUNT_RANGE: RangeInclusive<i64> = 1..=999;
/// Kilometre fields.
pub const KM_RANGE: RangeInclusive<i64> = 1_000..=99_999;
/// Allowed gap between a reason breakdown and its total.
pub const CONSISTENCY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    MissingValue,
    NotInteger,
    OutOfRange,
    NegativeValue,
    ConsistencyViolation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::MissingValue => "MissingValue",
            ErrorKind::NotInteger => "NotInteger",
            ErrorKind::OutOfRange => "OutOfRange",
            ErrorKind::NegativeValue => "NegativeValue",
            ErrorKind::ConsistencyViolation => "ConsistencyViolation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ValidationError {
    #[serde(rename = "Field")]
    #[tabled(rename = "Field")]
    pub field: String,
    #[serde(rename = "Kind")]
    #[tabled(rename = "Kind")]
    pub kind: ErrorKind,
    #[serde(rename = "Message")]
    #[tabled(rename = "Message")]
    pub message: String,
}

impl ValidationError {
    fn new(metric: Metric, kind: ErrorKind, message: String) -> Self {
        Self {
            field: metric.column().to_string(),
            kind,
            message,
        }
    }
}

/// The cells a user may type into. Only these are range-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableFields(BTreeSet<Metric>);

impl EditableFields {
    pub fn new(metrics: impl IntoIterator<Item = Metric>) -> Self {
        Self(metrics.into_iter().collect())
    }

    /// Build from column names or labels; unknown names are an error.
    pub fn from_keys<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let metrics = keys
            .into_iter()
            .map(|k| k.as_ref().parse::<Metric>())
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Self(metrics))
    }

    /// Same set minus cells that are already locked in the store.
    pub fn without(&self, locked: &BTreeSet<Metric>) -> Self {
        Self(self.0.difference(locked).copied().collect())
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.0.contains(&metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = Metric> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for EditableFields {
    /// Every raw input plus Service/Driver Check.
    fn default() -> Self {
        Self::new(Metric::inputs().chain(std::iter::once(Metric::ServicePerDriverCheck)))
    }
}

enum Rule {
    Within(RangeInclusive<i64>),
    Positive,
    NonNegative,
}

fn rule_for(metric: Metric) -> Rule {
    use Metric::*;
    match metric {
        Schedules | SchedulesServices | PlannedSchedules | PlannedServices | ActualServices
        | TotalDrivers => Rule::Within(COUNT_RANGE),
        SchedulesKms | PlannedKm | ActualKm => Rule::Within(KM_RANGE),
        DriversRequired | ServicePerDriverCheck => Rule::Positive,
        _ => Rule::NonNegative,
    }
}

fn check_field(metric: Metric, value: Option<f64>) -> Option<ValidationError> {
    let Some(value) = value else {
        return Some(ValidationError::new(
            metric,
            ErrorKind::MissingValue,
            format!("'{}' is empty", metric),
        ));
    };
    if !value.is_finite() || value.fract() != 0.0 {
        return Some(ValidationError::new(
            metric,
            ErrorKind::NotInteger,
            format!("'{}' must be an integer", metric),
        ));
    }
    let value = value as i64;
    match rule_for(metric) {
        Rule::Within(range) if !range.contains(&value) => Some(ValidationError::new(
            metric,
            ErrorKind::OutOfRange,
            format!(
                "'{}' must be between {} and {} (got {})",
                metric,
                range.start(),
                range.end(),
                value
            ),
        )),
        Rule::Positive if value <= 0 => Some(ValidationError::new(
            metric,
            ErrorKind::OutOfRange,
            format!("'{}' must be greater than 0 (got {})", metric, value),
        )),
        Rule::NonNegative if value < 0 => Some(ValidationError::new(
            metric,
            ErrorKind::NegativeValue,
            format!("'{}' cannot be negative (got {})", metric, value),
        )),
        _ => None,
    }
}

fn check_breakdown(
    diff_metric: Metric,
    reasons_total: f64,
    total_metric: Metric,
    record: &MetricMap,
) -> Option<ValidationError> {
    let expected = operand(record, total_metric);
    let diff = reasons_total - expected;
    if diff.abs() > CONSISTENCY_TOLERANCE {
        return Some(ValidationError::new(
            diff_metric,
            ErrorKind::ConsistencyViolation,
            format!(
                "'{}' must be 0 (sum of reasons: {}, {}: {})",
                diff_metric, reasons_total, total_metric, expected
            ),
        ));
    }
    None
}

/// Check the editable cells of `record`, then the MU/SL breakdowns.
///
/// Errors come out in sheet order. Breakdown sums are taken from the reason
/// cells themselves, not from stored totals.
pub fn validate(record: &MetricMap, editable: &EditableFields) -> Vec<ValidationError> {
    let mut errors: Vec<ValidationError> = editable
        .iter()
        .filter_map(|metric| check_field(metric, get(record, metric)))
        .collect();
    errors.extend(check_breakdown(
        Metric::DiffMuReasons,
        mu_reason_total(record),
        Metric::MedicallyUnfit,
        record,
    ));
    errors.extend(check_breakdown(
        Metric::DiffSlReasons,
        sl_reason_total(record),
        Metric::SickLeave,
        record,
    ));
    errors
}
