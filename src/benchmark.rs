// Depot categories and the benchmark tables the ratio reports compare against.
//
// Benchmarks are display-only: no formula in the engine reads them.
use crate::error::Error;
use crate::metric::Metric;
use crate::util::round_to;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DepotCategory {
    Rural,
    Urban,
}

impl DepotCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DepotCategory::Rural => "Rural",
            DepotCategory::Urban => "Urban",
        }
    }
}

impl fmt::Display for DepotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepotCategory {
    type Err = Error;

    /// Case-insensitive: the admin table stores `RURAL`, `rural`, `Rural`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("rural") {
            Ok(DepotCategory::Rural)
        } else if s.eq_ignore_ascii_case("urban") {
            Ok(DepotCategory::Urban)
        } else {
            Err(Error::UnknownCategory(s.to_string()))
        }
    }
}

impl TryFrom<String> for DepotCategory {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DepotCategory> for String {
    fn from(value: DepotCategory) -> Self {
        value.as_str().to_string()
    }
}

/// A benchmarked quantity on the productivity-ratio reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Indicator {
    WeeklyOff,
    SpecialOff,
    Others,
    LeaveAbsent,
    SickLeave,
    SpotAbsent,
    DoubleDuty,
    OffCancellation,
    DriversPerSchedule,
}

impl Indicator {
    /// The eight percentage shares, in report order.
    pub const SHARES: [Indicator; 8] = [
        Indicator::WeeklyOff,
        Indicator::SpecialOff,
        Indicator::Others,
        Indicator::LeaveAbsent,
        Indicator::SickLeave,
        Indicator::SpotAbsent,
        Indicator::DoubleDuty,
        Indicator::OffCancellation,
    ];

    pub const ALL: [Indicator; 9] = [
        Indicator::WeeklyOff,
        Indicator::SpecialOff,
        Indicator::Others,
        Indicator::LeaveAbsent,
        Indicator::SickLeave,
        Indicator::SpotAbsent,
        Indicator::DoubleDuty,
        Indicator::OffCancellation,
        Indicator::DriversPerSchedule,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Indicator::WeeklyOff => "Weekly Off",
            Indicator::SpecialOff => "Special Off (Night Out/IC, Online)",
            Indicator::Others => "Others",
            Indicator::LeaveAbsent => "Long Leave & Absent",
            Indicator::SickLeave => "Sick Leave",
            Indicator::SpotAbsent => "Spot Absent",
            Indicator::DoubleDuty => "Double Duty",
            Indicator::OffCancellation => "Off Cancellation",
            Indicator::DriversPerSchedule => "Drivers/Schedule",
        }
    }

    /// Stored percentage field averaged for this indicator.
    pub fn share_metric(self) -> Option<Metric> {
        match self {
            Indicator::WeeklyOff => Some(Metric::PctWeeklyOff),
            Indicator::SpecialOff => Some(Metric::PctSpecialOff),
            Indicator::Others => Some(Metric::PctOthers),
            Indicator::LeaveAbsent => Some(Metric::PctLeaveAbsent),
            Indicator::SickLeave => Some(Metric::PctSickLeave),
            Indicator::SpotAbsent => Some(Metric::PctSpotAbsent),
            Indicator::DoubleDuty => Some(Metric::PctDoubleDuty),
            Indicator::OffCancellation => Some(Metric::PctOffCancellation),
            Indicator::DriversPerSchedule => None,
        }
    }

    /// Accepts the indicator label or the column/label of its share metric.
    pub fn from_key(key: &str) -> Option<Indicator> {
        let key = key.trim();
        let metric = Metric::from_key(key);
        Self::ALL.into_iter().find(|i| {
            i.label().eq_ignore_ascii_case(key) || (metric.is_some() && i.share_metric() == metric)
        })
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Indicator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Indicator::from_key(s).ok_or_else(|| Error::UnknownIndicator(s.trim().to_string()))
    }
}

impl TryFrom<String> for Indicator {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Indicator> for String {
    fn from(value: Indicator) -> Self {
        value.label().to_string()
    }
}

/// Category → indicator → target value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchmarkTable(BTreeMap<DepotCategory, BTreeMap<Indicator, f64>>);

impl BenchmarkTable {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, category: DepotCategory, indicator: Indicator, value: f64) -> Self {
        self.0.entry(category).or_default().insert(indicator, value);
        self
    }

    pub fn get(&self, category: DepotCategory, indicator: Indicator) -> Option<f64> {
        self.0.get(&category)?.get(&indicator).copied()
    }

    pub fn compare(
        &self,
        category: DepotCategory,
        indicator: Indicator,
        actual: Option<f64>,
    ) -> Comparison {
        Comparison::new(indicator, self.get(category, indicator), actual)
    }
}

impl Default for BenchmarkTable {
    /// Productivity-budget targets used by the corporation.
    fn default() -> Self {
        use DepotCategory::{Rural, Urban};
        use Indicator::*;
        let rural = [
            (WeeklyOff, 14.0),
            (SpecialOff, 25.0),
            (Others, 1.7),
            (LeaveAbsent, 2.0),
            (SickLeave, 2.0),
            (SpotAbsent, 1.0),
            (DoubleDuty, 16.0),
            (OffCancellation, 2.0),
            (DriversPerSchedule, 2.18),
        ];
        let urban = [
            (WeeklyOff, 14.0),
            (SpecialOff, 27.4),
            (Others, 1.0),
            (LeaveAbsent, 6.0),
            (SickLeave, 2.0),
            (SpotAbsent, 2.0),
            (DoubleDuty, 8.0),
            (OffCancellation, 2.0),
            (DriversPerSchedule, 2.43),
        ];
        let mut table = Self::empty();
        for (indicator, value) in rural {
            table = table.with(Rural, indicator, value);
        }
        for (indicator, value) in urban {
            table = table.with(Urban, indicator, value);
        }
        table
    }
}

/// An actual value next to its benchmark.
///
/// Lower is better for every indicator, so a value is within benchmark when
/// `actual - benchmark <= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub indicator: Indicator,
    pub benchmark: Option<f64>,
    pub actual: Option<f64>,
    pub variance: Option<f64>,
}

impl Comparison {
    pub fn new(indicator: Indicator, benchmark: Option<f64>, actual: Option<f64>) -> Self {
        let variance = match (actual, benchmark) {
            (Some(a), Some(b)) => Some(round_to(a - b, 2)),
            _ => None,
        };
        Self {
            indicator,
            benchmark,
            actual,
            variance,
        }
    }

    pub fn within_benchmark(&self) -> Option<bool> {
        self.variance.map(|v| v <= 0.0)
    }
}

/// Depot name → category, as kept by the admin reference table.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex(HashMap<String, DepotCategory>);

impl CategoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(depot: &str) -> String {
        depot.trim().to_uppercase()
    }

    pub fn insert(&mut self, depot: &str, category: DepotCategory) {
        self.0.insert(Self::normalize(depot), category);
    }

    /// Lookup ignores case and surrounding whitespace.
    pub fn category_of(&self, depot: &str) -> Option<DepotCategory> {
        self.0.get(&Self::normalize(depot)).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
