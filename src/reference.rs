//! Customer reference dataset, loaded once per run

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::info;

/// Read a CSV file into a trimming reader, dropping a UTF-8 byte-order
/// mark if the file carries one.
pub(crate) fn csv_reader(path: &Path) -> std::io::Result<csv::Reader<Cursor<Vec<u8>>>> {
    let mut bytes = std::fs::read(path)?;
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes.drain(..3);
    }
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(bytes)))
}

/// Customer standing; anything but `Active` blocks submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum CustomerStatus {
    Active,
    Inactive,
    Other,
}

impl From<String> for CustomerStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Active" => CustomerStatus::Active,
            "Inactive" => CustomerStatus::Inactive,
            _ => CustomerStatus::Other,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRecord {
    #[serde(rename = "CustomerID")]
    pub customer_id: String,
    #[serde(rename = "Status")]
    pub status: CustomerStatus,
}

/// In-memory customer index keyed by customer id, read-only after load
#[derive(Debug, Default)]
pub struct ReferenceStore {
    customers: HashMap<String, CustomerRecord>,
}

impl ReferenceStore {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv_reader(path)
            .map_err(|e| Error::Reference(format!("cannot read {}: {}", path.display(), e)))?;

        let mut customers = HashMap::new();
        for result in reader.deserialize() {
            let record: CustomerRecord = result
                .map_err(|e| Error::Reference(format!("bad row in {}: {}", path.display(), e)))?;
            customers.insert(record.customer_id.clone(), record);
        }

        info!("loaded {} customer records from {}", customers.len(), path.display());
        Ok(Self { customers })
    }

    /// Whether the customer exists and is permitted to submit orders
    pub fn is_active(&self, customer_id: &str) -> bool {
        self.customers
            .get(customer_id)
            .map(|c| c.status == CustomerStatus::Active)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}
