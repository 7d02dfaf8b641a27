//! Durable registry of already-submitted order keys
//!
//! The registry is the crash-recovery boundary: it is flushed after every
//! individual success, so a run killed mid-batch never resubmits an order
//! the endpoint already accepted.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct RegistryKey {
    order_id: String,
    business_date: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    processed: Vec<RegistryKey>,
}

/// Persisted set of `(OrderID, BusinessDate)` pairs submitted in any run
#[derive(Debug)]
pub struct IdempotencyRegistry {
    path: PathBuf,
    keys: BTreeSet<RegistryKey>,
}

impl IdempotencyRegistry {
    /// Load the registry, or start empty when the file does not exist.
    /// A file that exists but cannot be parsed is fatal: guessing here
    /// could resubmit orders.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let keys = if path.exists() {
            let contents = fs::read_to_string(path)?;
            let file: RegistryFile = serde_json::from_str(&contents)?;
            file.processed.into_iter().collect()
        } else {
            BTreeSet::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            keys,
        })
    }

    pub fn contains(&self, order_id: &str, business_date: &str) -> bool {
        self.keys.contains(&RegistryKey {
            order_id: order_id.to_string(),
            business_date: business_date.to_string(),
        })
    }

    /// Insert a key and flush the whole registry to disk before returning.
    /// The write goes through a temp file and an atomic rename so a crash
    /// leaves either the old or the new registry, never a torn file.
    pub fn record(&mut self, order_id: &str, business_date: &str) -> Result<()> {
        self.keys.insert(RegistryKey {
            order_id: order_id.to_string(),
            business_date: business_date.to_string(),
        });
        self.save()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let file = RegistryFile {
            processed: self.keys.iter().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path).map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = IdempotencyRegistry::load_or_create(&dir.path().join("reg.json")).unwrap();
        assert!(registry.is_empty());
        assert!(!registry.contains("A1", "2024-01-01"));
    }

    #[test]
    fn record_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reg.json");

        let mut registry = IdempotencyRegistry::load_or_create(&path).unwrap();
        registry.record("A1", "2024-01-01").unwrap();

        let reloaded = IdempotencyRegistry::load_or_create(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains("A1", "2024-01-01"));
        assert!(!reloaded.contains("A1", "2024-01-02"));
    }

    #[test]
    fn each_record_is_flushed_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reg.json");

        let mut registry = IdempotencyRegistry::load_or_create(&path).unwrap();
        registry.record("A1", "2024-01-01").unwrap();
        // Inspect the file directly, without going through the instance
        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["processed"].as_array().unwrap().len(), 1);

        registry.record("A2", "2024-01-02").unwrap();
        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["processed"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn corrupt_registry_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reg.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(IdempotencyRegistry::load_or_create(&path).is_err());
    }

    #[test]
    fn duplicate_record_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reg.json");
        let mut registry = IdempotencyRegistry::load_or_create(&path).unwrap();
        registry.record("A1", "2024-01-01").unwrap();
        registry.record("A1", "2024-01-01").unwrap();
        assert_eq!(registry.len(), 1);
    }
}
