//! End-of-run output artifacts: ledger, summary, checksum manifest

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::order::{LedgerEntry, RunStats};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

pub const LEDGER_FILE: &str = "processed.csv";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const REGISTRY_FILE: &str = "idempotency.json";
pub const CHECKSUM_FILE: &str = "checksums.txt";

/// Renders the final artifacts from the accumulated run state
pub struct ReportWriter<'a> {
    out_dir: &'a Path,
    config: &'a PipelineConfig,
}

impl<'a> ReportWriter<'a> {
    pub fn new(out_dir: &'a Path, config: &'a PipelineConfig) -> Self {
        Self { out_dir, config }
    }

    /// Write ledger, summary, and the checksum manifest over both plus the
    /// registry file. Takes the ledger by value: it is consumed exactly
    /// once, at the end of the run.
    pub fn write_all(&self, mut ledger: Vec<LedgerEntry>, stats: &RunStats) -> Result<()> {
        std::fs::create_dir_all(self.out_dir)?;

        // Deterministic output order, independent of input order
        ledger.sort_by(|a, b| {
            (a.business_date.as_str(), a.order_id.as_str())
                .cmp(&(b.business_date.as_str(), b.order_id.as_str()))
        });

        self.write_ledger(&ledger)?;
        self.write_summary(stats)?;
        self.write_checksums()?;

        info!("reports written to {}", self.out_dir.display());
        Ok(())
    }

    fn write_ledger(&self, ledger: &[LedgerEntry]) -> Result<()> {
        let mut writer = csv::Writer::from_path(self.out_dir.join(LEDGER_FILE))?;
        if ledger.is_empty() {
            // serialize only emits the header alongside the first row, so
            // an empty ledger still needs one written by hand
            writer.write_record(["OrderID", "BusinessDate", "Status", "Message", "TimestampUTC"])?;
        }
        for entry in ledger {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_summary(&self, stats: &RunStats) -> Result<()> {
        let mut out = String::new();
        let _ = writeln!(out, "Total rows read: {}", stats.total_read);
        let _ = writeln!(out, "Success count: {}", stats.success);
        let _ = writeln!(out, "Business error count: {}", stats.business_error);
        for (reason, count) in &stats.reasons {
            let _ = writeln!(out, "  - {}: {}", reason, count);
        }
        let _ = writeln!(out, "System error count: {}", stats.system_error);
        let _ = writeln!(out, "Skipped (idempotent) count: {}", stats.skipped);
        let _ = writeln!(out, "Success rate (%): {:.2}%", stats.success_rate());

        let _ = writeln!(out, "\nTotals by currency:");
        for (currency, total) in &stats.currency_totals {
            let _ = writeln!(
                out,
                "  {}: {:.prec$}",
                currency,
                total,
                prec = self.config.report_decimal_places
            );
        }

        let _ = writeln!(out, "\nConfig snapshot:");
        out.push_str(&self.config.snapshot());

        std::fs::write(self.out_dir.join(SUMMARY_FILE), out)?;
        Ok(())
    }

    /// One `sha256(filename)=hexdigest` line per artifact, fixed order.
    /// Artifacts that were never produced (no successes means no registry
    /// file, for instance) are left out.
    fn write_checksums(&self) -> Result<()> {
        let mut out = String::new();
        for name in [LEDGER_FILE, SUMMARY_FILE, REGISTRY_FILE] {
            let path = self.out_dir.join(name);
            if path.exists() {
                let digest = Sha256::digest(std::fs::read(&path)?);
                let _ = writeln!(out, "sha256({})={:x}", name, digest);
            }
        }
        std::fs::write(self.out_dir.join(CHECKSUM_FILE), out)?;
        Ok(())
    }
}

/// Path of the persisted registry inside the output directory
pub fn registry_path(out_dir: &Path) -> PathBuf {
    out_dir.join(REGISTRY_FILE)
}
