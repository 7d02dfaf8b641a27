//! Core data types: input rows, per-record outcomes, and run statistics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One input row, immutable once read.
///
/// `Amount` stays textual until validation so that format failures can be
/// reported distinctly from range failures. The serialized field names
/// match both the input header and the submission payload on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "OrderID")]
    pub order_id: String,
    #[serde(rename = "BusinessDate")]
    pub business_date: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "Currency")]
    pub currency: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "CustomerID")]
    pub customer_id: String,
}

impl OrderRecord {
    /// Identity key for dedup and idempotency: `(OrderID, BusinessDate)`
    pub fn key(&self) -> (String, String) {
        (self.order_id.clone(), self.business_date.clone())
    }
}

/// Terminal classification of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Success,
    Skipped,
    BusinessError,
    SystemError,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Success => "success",
            RecordStatus::Skipped => "skipped",
            RecordStatus::BusinessError => "business_error",
            RecordStatus::SystemError => "system_error",
        }
    }
}

/// One row of the results ledger
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    #[serde(rename = "OrderID")]
    pub order_id: String,
    #[serde(rename = "BusinessDate")]
    pub business_date: String,
    #[serde(rename = "Status")]
    pub status: RecordStatus,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "TimestampUTC")]
    pub timestamp_utc: String,
}

/// Counters accumulated over a run, consumed once by the report writer.
///
/// Reason and currency maps are ordered so the summary renders the same
/// way for the same inputs.
#[derive(Debug, Default)]
pub struct RunStats {
    pub total_read: u64,
    pub success: u64,
    pub business_error: u64,
    pub system_error: u64,
    pub skipped: u64,
    pub reasons: BTreeMap<String, u64>,
    pub currency_totals: BTreeMap<String, f64>,
}

impl RunStats {
    pub fn record_success(&mut self, currency: &str, amount: f64) {
        self.success += 1;
        *self.currency_totals.entry(currency.to_string()).or_default() += amount;
    }

    pub fn record_business_error(&mut self, reason: &str) {
        self.business_error += 1;
        *self.reasons.entry(reason.to_string()).or_default() += 1;
    }

    pub fn record_system_error(&mut self) {
        self.system_error += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Success rate as a percentage; 0 when nothing was read
    pub fn success_rate(&self) -> f64 {
        if self.total_read == 0 {
            0.0
        } else {
            self.success as f64 / self.total_read as f64 * 100.0
        }
    }
}
