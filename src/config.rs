// Application configuration (`kpi_config.json`).
//
// Every key is optional; anything left out falls back to the built-in
// default, and a missing file means "all defaults".
use crate::benchmark::BenchmarkTable;
use crate::error::Result;
use crate::validator::EditableFields;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "kpi_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub benchmarks: BenchmarkTable,
    /// Column names or labels the depot sheet lets users type into.
    pub editable_fields: Vec<String>,
    pub inputs_path: String,
    pub categories_path: String,
    pub output_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            benchmarks: BenchmarkTable::default(),
            editable_fields: EditableFields::default()
                .iter()
                .map(|m| m.column().to_string())
                .collect(),
            inputs_path: "depot_inputs.csv".to_string(),
            categories_path: "depot_categories.csv".to_string(),
            output_dir: ".".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&text)?;
        info!(path = %path.as_ref().display(), "configuration loaded");
        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults. A file that
    /// exists and does not parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            info!(path = %path.as_ref().display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn editable(&self) -> Result<EditableFields> {
        EditableFields::from_keys(&self.editable_fields)
    }

    pub fn output_path(&self, file: &str) -> std::path::PathBuf {
        Path::new(&self.output_dir).join(file)
    }
}
