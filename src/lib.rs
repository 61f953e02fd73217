//! Derived-metrics engine for daily depot driver-productivity sheets.
//!
//! Raw per-depot counts go in; the engine fills every derived column in
//! dependency order, the validator reports bad cells, and the aggregation
//! layer rolls stored records up into benchmarked ratio reports.
pub mod aggregate;
pub mod benchmark;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod logging;
pub mod metric;
pub mod output;
pub mod reports;
pub mod store;
pub mod types;
pub mod util;
pub mod validator;

pub use benchmark::{BenchmarkTable, DepotCategory, Indicator};
pub use engine::Engine;
pub use error::{Error, Result};
pub use metric::{Metric, MetricMap, MetricRecord};
pub use validator::{EditableFields, ErrorKind, ValidationError};
