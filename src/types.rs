use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One row of the depot reference table (`depot_categories.csv`).
#[derive(Debug, Deserialize)]
pub struct DepotRow {
    #[serde(rename = "depot_name", alias = "Depot", alias = "DepotName")]
    pub depot_name: Option<String>,
    #[serde(rename = "category", alias = "Category")]
    pub category: Option<String>,
    #[serde(rename = "zone", alias = "Zone", default)]
    pub zone: Option<String>,
    #[serde(rename = "region", alias = "Region", default)]
    pub region: Option<String>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DepotRatioRow {
    /// Shown in the table title, kept as a column in the CSV export.
    #[serde(rename = "Depot")]
    #[tabled(skip)]
    pub depot: String,
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Benchmark")]
    #[tabled(rename = "Benchmark")]
    pub benchmark: String,
    #[serde(rename = "Actual")]
    #[tabled(rename = "Actual")]
    pub actual: String,
    #[serde(rename = "Variance")]
    #[tabled(rename = "Variance")]
    pub variance: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionRatioRow {
    #[serde(rename = "Depot")]
    #[tabled(rename = "Depot")]
    pub depot: String,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Benchmark")]
    #[tabled(rename = "Benchmark")]
    pub benchmark: String,
    #[serde(rename = "Actual")]
    #[tabled(rename = "Actual")]
    pub actual: String,
    #[serde(rename = "Variance")]
    #[tabled(rename = "Variance")]
    pub variance: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RollupTableRow {
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Aggregate")]
    #[tabled(rename = "Aggregate")]
    pub aggregate: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Records")]
    #[tabled(rename = "Records")]
    pub records: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_records: usize,
    pub total_depots: usize,
    pub rejected_records: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub avg_km_per_driver: Option<f64>,
    pub total_driver_shortage: f64,
}
