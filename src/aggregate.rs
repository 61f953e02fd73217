// Time-window rollups and productivity ratios over stored records.
//
// Everything here reads values the engine already computed; nothing in this
// module evaluates a formula.
use crate::benchmark::{BenchmarkTable, CategoryIndex, Comparison, DepotCategory, Indicator};
use crate::metric::{Metric, MetricRecord};
use crate::util::{mean_present, round_to};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Daily(NaiveDate),
    Monthly { year: i32, month: u32 },
    Quarterly { year: i32, quarter: u32 },
    Yearly(i32),
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl Period {
    pub fn containing(granularity: Granularity, date: NaiveDate) -> Period {
        match granularity {
            Granularity::Daily => Period::Daily(date),
            Granularity::Monthly => Period::Monthly {
                year: date.year(),
                month: date.month(),
            },
            Granularity::Quarterly => Period::Quarterly {
                year: date.year(),
                quarter: (date.month() - 1) / 3 + 1,
            },
            Granularity::Yearly => Period::Yearly(date.year()),
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Period::Daily(_) => Granularity::Daily,
            Period::Monthly { .. } => Granularity::Monthly,
            Period::Quarterly { .. } => Granularity::Quarterly,
            Period::Yearly(_) => Granularity::Yearly,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Period::containing(self.granularity(), date) == *self
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Period::Daily(d) => write!(f, "{}", d.format("%d-%b-%Y")),
            Period::Monthly { year, month } => {
                write!(f, "{} {}", MONTHS[(month as usize).saturating_sub(1) % 12], year)
            }
            Period::Quarterly { year, quarter } => {
                let first = (quarter as usize).saturating_sub(1) * 3;
                write!(
                    f,
                    "Q{} ({}-{}) {}",
                    quarter,
                    MONTHS[first % 12],
                    MONTHS[(first + 2) % 12],
                    year
                )
            }
            Period::Yearly(year) => write!(f, "{}", year),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Mean,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Sum => f.write_str("Sum"),
            Aggregate::Mean => f.write_str("Mean"),
        }
    }
}

pub fn in_period<'a>(records: &'a [MetricRecord], period: &Period) -> Vec<&'a MetricRecord> {
    records.iter().filter(|r| period.contains(r.date)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollupBucket {
    pub period: Period,
    pub value: Option<f64>,
    pub records: usize,
}

/// Bucket `metric` by period, chronologically. Blank cells are skipped; a
/// bucket with no values at all reports `None`.
pub fn rollup(
    records: &[MetricRecord],
    metric: Metric,
    granularity: Granularity,
    aggregate: Aggregate,
) -> Vec<RollupBucket> {
    let mut buckets: BTreeMap<Period, (Vec<Option<f64>>, usize)> = BTreeMap::new();
    for r in records {
        let e = buckets
            .entry(Period::containing(granularity, r.date))
            .or_default();
        e.0.push(r.get(metric));
        e.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(period, (values, count))| {
            let value = match aggregate {
                Aggregate::Mean => mean_present(values),
                Aggregate::Sum => {
                    let present: Vec<f64> = values.into_iter().flatten().collect();
                    if present.is_empty() {
                        None
                    } else {
                        Some(present.iter().sum())
                    }
                }
            };
            RollupBucket {
                period,
                value,
                records: count,
            }
        })
        .collect()
}

/// The "8 ratios" view of one depot over one period.
#[derive(Debug, Clone, PartialEq)]
pub struct DepotRatios {
    pub depot: String,
    pub category: DepotCategory,
    pub period: Period,
    pub days_considered: usize,
    pub planned_schedules: f64,
    pub total_drivers: f64,
    pub drivers_per_schedule: f64,
    /// The eight shares followed by Drivers/Schedule.
    pub comparisons: Vec<Comparison>,
}

impl DepotRatios {
    pub fn comparison(&self, indicator: Indicator) -> Option<&Comparison> {
        self.comparisons.iter().find(|c| c.indicator == indicator)
    }
}

fn sum_of(records: &[&MetricRecord], metric: Metric) -> f64 {
    records.iter().filter_map(|r| r.get(metric)).sum()
}

fn ratios_for(
    depot: &str,
    records: &[&MetricRecord],
    category: DepotCategory,
    period: Period,
    benchmarks: &BenchmarkTable,
    share_decimals: i32,
) -> Option<DepotRatios> {
    if records.is_empty() {
        return None;
    }
    let days: BTreeSet<NaiveDate> = records.iter().map(|r| r.date).collect();
    let planned_schedules = sum_of(records, Metric::PlannedSchedules);
    let total_drivers = sum_of(records, Metric::TotalDrivers);
    let drivers_per_schedule = if planned_schedules != 0.0 {
        round_to(total_drivers / planned_schedules, 2)
    } else {
        0.0
    };

    let mut comparisons: Vec<Comparison> = Indicator::SHARES
        .iter()
        .filter_map(|indicator| {
            let metric = indicator.share_metric()?;
            let mean = mean_present(records.iter().map(|r| r.get(metric)))
                .map(|v| round_to(v, share_decimals));
            Some(benchmarks.compare(category, *indicator, mean))
        })
        .collect();
    comparisons.push(benchmarks.compare(
        category,
        Indicator::DriversPerSchedule,
        Some(drivers_per_schedule),
    ));

    Some(DepotRatios {
        depot: depot.to_string(),
        category,
        period,
        days_considered: days.len(),
        planned_schedules,
        total_drivers,
        drivers_per_schedule,
        comparisons,
    })
}

/// Ratios for one depot; `None` when it has no records in `period`.
///
/// Planned Schedules and Total Drivers are sums over the period, the shares
/// are means of the stored daily percentages (2 dp) and Drivers/Schedule is
/// Σ Total Drivers / Σ Planned Schedules.
pub fn depot_ratios(
    records: &[MetricRecord],
    depot: &str,
    category: DepotCategory,
    period: Period,
    benchmarks: &BenchmarkTable,
) -> Option<DepotRatios> {
    let selected: Vec<&MetricRecord> = records
        .iter()
        .filter(|r| r.depot == depot && period.contains(r.date))
        .collect();
    ratios_for(depot, &selected, category, period, benchmarks, 2)
}

/// Region-wide mean of one report line across depots.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAverage {
    pub label: String,
    /// Benchmarks averaged over the depots' categories (1 dp).
    pub benchmark: Option<f64>,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionRatios {
    pub period: Period,
    pub depots: Vec<DepotRatios>,
    pub averages: Vec<RegionAverage>,
}

/// Per-depot ratios (shares at 1 dp) for every depot with data in `period`,
/// plus region averages. Depots missing from `categories` are skipped.
pub fn region_ratios(
    records: &[MetricRecord],
    categories: &CategoryIndex,
    period: Period,
    benchmarks: &BenchmarkTable,
) -> RegionRatios {
    let mut by_depot: BTreeMap<&str, Vec<&MetricRecord>> = BTreeMap::new();
    for r in records.iter().filter(|r| period.contains(r.date)) {
        by_depot.entry(r.depot.as_str()).or_default().push(r);
    }

    let mut depots = Vec::with_capacity(by_depot.len());
    for (depot, rows) in by_depot {
        let Some(category) = categories.category_of(depot) else {
            warn!(depot, "no category on file, depot left out of region ratios");
            continue;
        };
        depots.extend(ratios_for(depot, &rows, category, period, benchmarks, 1));
    }

    let mut averages = vec![
        RegionAverage {
            label: Metric::PlannedSchedules.label().to_string(),
            benchmark: None,
            average: mean_present(depots.iter().map(|d| Some(d.planned_schedules)))
                .map(|v| round_to(v, 2)),
        },
        RegionAverage {
            label: Metric::TotalDrivers.label().to_string(),
            benchmark: None,
            average: mean_present(depots.iter().map(|d| Some(d.total_drivers)))
                .map(|v| round_to(v, 2)),
        },
    ];
    for indicator in Indicator::ALL {
        let benchmark = mean_present(depots.iter().map(|d| benchmarks.get(d.category, indicator)))
            .map(|v| round_to(v, 1));
        let average = mean_present(
            depots
                .iter()
                .map(|d| d.comparison(indicator).and_then(|c| c.actual)),
        )
        .map(|v| round_to(v, 2));
        averages.push(RegionAverage {
            label: indicator.label().to_string(),
            benchmark,
            average,
        });
    }

    RegionRatios {
        period,
        depots,
        averages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(depot: &str, on: NaiveDate, values: &[(Metric, f64)]) -> MetricRecord {
        let mut r = MetricRecord::new(depot, on);
        for (m, v) in values {
            r.set(*m, Some(*v));
        }
        r
    }

    #[test]
    fn quarter_boundaries() {
        assert_eq!(
            Period::containing(Granularity::Quarterly, date(2025, 3, 31)),
            Period::Quarterly {
                year: 2025,
                quarter: 1
            }
        );
        let q2 = Period::containing(Granularity::Quarterly, date(2025, 4, 1));
        assert_eq!(
            q2,
            Period::Quarterly {
                year: 2025,
                quarter: 2
            }
        );
        assert!(q2.contains(date(2025, 6, 30)));
        assert!(!q2.contains(date(2025, 7, 1)));
        assert_eq!(q2.to_string(), "Q2 (Apr-Jun) 2025");
    }

    #[test]
    fn period_labels() {
        assert_eq!(Period::Daily(date(2025, 6, 23)).to_string(), "23-Jun-2025");
        assert_eq!(
            Period::Monthly {
                year: 2025,
                month: 12
            }
            .to_string(),
            "Dec 2025"
        );
        assert_eq!(Period::Yearly(2024).to_string(), "2024");
    }

    #[test]
    fn monthly_rollup_sums_and_means() {
        let records = vec![
            record("A", date(2025, 1, 30), &[(Metric::ActualKm, 100.0)]),
            record("A", date(2025, 1, 31), &[(Metric::ActualKm, 300.0)]),
            record("A", date(2025, 2, 1), &[(Metric::ActualKm, 50.0)]),
            record("A", date(2025, 2, 2), &[]),
        ];
        let sums = rollup(&records, Metric::ActualKm, Granularity::Monthly, Aggregate::Sum);
        assert_eq!(sums.len(), 2);
        assert_eq!(sums[0].value, Some(400.0));
        assert_eq!(sums[0].records, 2);
        assert_eq!(sums[1].value, Some(50.0));
        assert_eq!(sums[1].records, 2);

        let means = rollup(&records, Metric::ActualKm, Granularity::Monthly, Aggregate::Mean);
        assert_eq!(means[0].value, Some(200.0));
        assert_eq!(means[1].value, Some(50.0));
    }

    #[test]
    fn depot_ratios_sum_and_average() {
        let records = vec![
            record(
                "Miyapur",
                date(2025, 5, 1),
                &[
                    (Metric::PlannedSchedules, 40.0),
                    (Metric::TotalDrivers, 90.0),
                    (Metric::PctSickLeave, 3.0),
                ],
            ),
            record(
                "Miyapur",
                date(2025, 5, 2),
                &[
                    (Metric::PlannedSchedules, 40.0),
                    (Metric::TotalDrivers, 94.0),
                    (Metric::PctSickLeave, 2.0),
                ],
            ),
            record("Miyapur", date(2025, 6, 1), &[(Metric::TotalDrivers, 500.0)]),
            record("Jangaon", date(2025, 5, 1), &[(Metric::TotalDrivers, 500.0)]),
        ];
        let period = Period::Monthly {
            year: 2025,
            month: 5,
        };
        let ratios = depot_ratios(
            &records,
            "Miyapur",
            DepotCategory::Urban,
            period,
            &BenchmarkTable::default(),
        )
        .unwrap();
        assert_eq!(ratios.days_considered, 2);
        assert_eq!(ratios.planned_schedules, 80.0);
        assert_eq!(ratios.total_drivers, 184.0);
        assert_eq!(ratios.drivers_per_schedule, 2.3);

        let sick = ratios.comparison(Indicator::SickLeave).unwrap();
        assert_eq!(sick.actual, Some(2.5));
        assert_eq!(sick.benchmark, Some(2.0));
        assert_eq!(sick.within_benchmark(), Some(false));

        let per_schedule = ratios.comparison(Indicator::DriversPerSchedule).unwrap();
        assert_eq!(per_schedule.variance, Some(-0.13));

        // No shares stored: blank, not zero.
        assert_eq!(ratios.comparison(Indicator::DoubleDuty).unwrap().actual, None);
    }

    #[test]
    fn depot_without_data_has_no_ratios() {
        let ratios = depot_ratios(
            &[],
            "Miyapur",
            DepotCategory::Rural,
            Period::Yearly(2025),
            &BenchmarkTable::default(),
        );
        assert!(ratios.is_none());
    }

    #[test]
    fn region_averages_across_depots() {
        let on = date(2025, 5, 1);
        let records = vec![
            record(
                "Miyapur",
                on,
                &[
                    (Metric::PlannedSchedules, 40.0),
                    (Metric::TotalDrivers, 100.0),
                    (Metric::PctSpotAbsent, 2.0),
                ],
            ),
            record(
                "Jangaon",
                on,
                &[
                    (Metric::PlannedSchedules, 20.0),
                    (Metric::TotalDrivers, 44.0),
                    (Metric::PctSpotAbsent, 1.0),
                ],
            ),
            record("Unlisted", on, &[(Metric::TotalDrivers, 10.0)]),
        ];
        let mut categories = CategoryIndex::new();
        categories.insert("Miyapur", DepotCategory::Urban);
        categories.insert("Jangaon", DepotCategory::Rural);

        let region = region_ratios(
            &records,
            &categories,
            Period::Daily(on),
            &BenchmarkTable::default(),
        );
        assert_eq!(region.depots.len(), 2);
        let spot = region
            .averages
            .iter()
            .find(|a| a.label == "Spot Absent")
            .unwrap();
        assert_eq!(spot.average, Some(1.5));
        // Urban 2.0 and Rural 1.0
        assert_eq!(spot.benchmark, Some(1.5));

        let drivers = &region.averages[1];
        assert_eq!(drivers.label, "Total Drivers");
        assert_eq!(drivers.average, Some(72.0));
    }
}
