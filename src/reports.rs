// Render aggregation results into flat, printable report rows.
use crate::aggregate::{Aggregate, DepotRatios, RegionRatios, RollupBucket};
use crate::benchmark::Comparison;
use crate::metric::{Metric, MetricRecord};
use crate::types::{DepotRatioRow, RegionRatioRow, RollupTableRow, SummaryStats};
use crate::util::{format_number, format_optional, mean_present};
use std::collections::HashSet;

fn status(c: &Comparison) -> String {
    match c.within_benchmark() {
        Some(true) => "OK".to_string(),
        Some(false) => "Above Benchmark".to_string(),
        None => "---".to_string(),
    }
}

fn signed(n: Option<f64>, decimals: usize) -> String {
    match n {
        Some(v) if v > 0.0 => format!("+{}", format_number(v, decimals)),
        other => format_optional(other, decimals),
    }
}

pub fn depot_ratio_rows(ratios: &DepotRatios) -> Vec<DepotRatioRow> {
    let mut rows = vec![
        DepotRatioRow {
            depot: ratios.depot.clone(),
            metric: Metric::PlannedSchedules.label().to_string(),
            benchmark: "---".to_string(),
            actual: format_number(ratios.planned_schedules, 0),
            variance: "---".to_string(),
            status: "---".to_string(),
        },
        DepotRatioRow {
            depot: ratios.depot.clone(),
            metric: Metric::TotalDrivers.label().to_string(),
            benchmark: "---".to_string(),
            actual: format_number(ratios.total_drivers, 0),
            variance: "---".to_string(),
            status: "---".to_string(),
        },
    ];
    for c in &ratios.comparisons {
        let metric = match c.indicator.share_metric() {
            Some(_) => format!("{} (%)", c.indicator),
            None => format!("{} (Ratio)", c.indicator),
        };
        rows.push(DepotRatioRow {
            depot: ratios.depot.clone(),
            metric,
            benchmark: format_optional(c.benchmark, 2),
            actual: format_optional(c.actual, 2),
            variance: signed(c.variance, 2),
            status: status(c),
        });
    }
    rows
}

pub fn region_ratio_rows(region: &RegionRatios) -> Vec<RegionRatioRow> {
    let mut rows = Vec::new();
    for depot in &region.depots {
        for c in &depot.comparisons {
            rows.push(RegionRatioRow {
                depot: depot.depot.clone(),
                category: depot.category.to_string(),
                metric: c.indicator.to_string(),
                benchmark: format_optional(c.benchmark, 2),
                actual: format_optional(c.actual, 2),
                variance: signed(c.variance, 2),
            });
        }
    }
    for avg in &region.averages {
        let variance = match (avg.average, avg.benchmark) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        };
        rows.push(RegionRatioRow {
            depot: "REGION".to_string(),
            category: "Average".to_string(),
            metric: avg.label.clone(),
            benchmark: format_optional(avg.benchmark, 1),
            actual: format_optional(avg.average, 2),
            variance: signed(variance, 2),
        });
    }
    rows
}

pub fn rollup_rows(metric: Metric, aggregate: Aggregate, buckets: &[RollupBucket]) -> Vec<RollupTableRow> {
    buckets
        .iter()
        .map(|b| RollupTableRow {
            period: b.period.to_string(),
            metric: metric.label().to_string(),
            aggregate: aggregate.to_string(),
            value: format_optional(b.value, 2),
            records: b.records,
        })
        .collect()
}

pub fn generate_summary(records: &[MetricRecord], rejected_records: usize) -> SummaryStats {
    let depots: HashSet<&str> = records.iter().map(|r| r.depot.as_str()).collect();
    let first_date = records.iter().map(|r| r.date).min();
    let last_date = records.iter().map(|r| r.date).max();
    SummaryStats {
        total_records: records.len(),
        total_depots: depots.len(),
        rejected_records,
        first_date: first_date.map(|d| d.format("%Y-%m-%d").to_string()),
        last_date: last_date.map(|d| d.format("%Y-%m-%d").to_string()),
        avg_km_per_driver: mean_present(records.iter().map(|r| r.get(Metric::KmPerDriver))),
        total_driver_shortage: records
            .iter()
            .filter_map(|r| r.get(Metric::DriverShortage))
            .sum(),
    }
}
