//! Runtime configuration loading and validation

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Typed pipeline configuration, loaded once at startup.
///
/// Every key is required; a missing or mistyped key aborts the run
/// before any record is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub api_host: String,
    pub api_port: u16,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub allowed_currencies: Vec<String>,
    pub business_date_window_days: i64,
    pub report_decimal_places: usize,
}

impl PipelineConfig {
    /// Load and type-check the configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;

        let config: PipelineConfig = serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("invalid config {}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Full URL of the order acceptance endpoint
    pub fn endpoint_url(&self) -> String {
        format!("http://{}:{}/api/orders", self.api_host, self.api_port)
    }

    /// Pretty JSON snapshot for the summary report and the start-of-run log line
    pub fn snapshot(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
