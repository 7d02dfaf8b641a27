//! Per-record pipeline: read, validate, submit, record, report
//!
//! Records are processed strictly sequentially. Each record reaches
//! exactly one terminal outcome, and a success is durable in the registry
//! before the next record is touched.

use crate::client::{SubmissionClient, SubmitOutcome};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::order::{LedgerEntry, OrderRecord, RecordStatus, RunStats};
use crate::reference::{self, ReferenceStore};
use crate::registry::IdempotencyRegistry;
use crate::report::ReportWriter;
use crate::validate::{validate, Verdict};
use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info, warn};

pub struct Orchestrator {
    config: PipelineConfig,
    reference: ReferenceStore,
    registry: IdempotencyRegistry,
    client: SubmissionClient,
    seen: HashSet<(String, String)>,
    stats: RunStats,
    ledger: Vec<LedgerEntry>,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        reference: ReferenceStore,
        registry: IdempotencyRegistry,
    ) -> Result<Self> {
        let client = SubmissionClient::new(&config)?;
        Ok(Self {
            config,
            reference,
            registry,
            client,
            seen: HashSet::new(),
            stats: RunStats::default(),
            ledger: Vec::new(),
        })
    }

    /// Process the whole input and write the report artifacts.
    ///
    /// An input read failure aborts the batch but the artifacts for the
    /// records processed so far are still written; the error is returned
    /// after they are on disk.
    pub async fn run(&mut self, orders_path: &Path, out_dir: &Path) -> Result<()> {
        info!(
            "starting run against {} with {:?}",
            self.config.endpoint_url(),
            self.config
        );

        let read_result = self.process_input(orders_path).await;
        if let Err(e) = &read_result {
            error!("aborting batch: {}", e);
        }

        ReportWriter::new(out_dir, &self.config)
            .write_all(std::mem::take(&mut self.ledger), &self.stats)?;

        info!(
            "run finished: read={} success={} skipped={} business_errors={} system_errors={}",
            self.stats.total_read,
            self.stats.success,
            self.stats.skipped,
            self.stats.business_error,
            self.stats.system_error
        );
        read_result
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    async fn process_input(&mut self, orders_path: &Path) -> Result<()> {
        let mut reader = reference::csv_reader(orders_path)
            .map_err(|e| Error::InputRead(format!("cannot read {}: {}", orders_path.display(), e)))?;

        for result in reader.deserialize::<OrderRecord>() {
            let record = result
                .map_err(|e| Error::InputRead(format!("bad row in {}: {}", orders_path.display(), e)))?;
            self.stats.total_read += 1;
            self.process_record(&record).await;
        }
        Ok(())
    }

    /// Drive one record to its terminal outcome. Never returns an error:
    /// whatever goes wrong stays inside this record's classification.
    async fn process_record(&mut self, record: &OrderRecord) {
        let today = Utc::now().date_naive();
        let verdict = validate(
            record,
            &self.reference,
            &self.config,
            today,
            &mut self.seen,
            &self.registry,
        );

        match verdict {
            Verdict::AlreadyProcessed => {
                info!("skipping already processed order {}", record.order_id);
                self.stats.record_skipped();
                self.push_entry(record, RecordStatus::Skipped, "Already processed");
            }
            Verdict::Rejected(reason) => {
                info!("rejected order {}: {}", record.order_id, reason);
                self.stats.record_business_error(reason);
                self.push_entry(record, RecordStatus::BusinessError, reason);
            }
            Verdict::Valid { amount } => match self.client.submit(record).await {
                SubmitOutcome::Submitted => self.finish_success(record, amount),
                SubmitOutcome::Rejected(reason) => {
                    info!("endpoint rejected order {}: {}", record.order_id, reason);
                    self.stats.record_business_error(&reason);
                    self.push_entry(record, RecordStatus::BusinessError, &reason);
                }
                SubmitOutcome::Failed(reason) => {
                    warn!("order {} failed: {}", record.order_id, reason);
                    self.stats.record_system_error();
                    self.push_entry(record, RecordStatus::SystemError, &reason);
                }
            },
        }
    }

    /// Record a success durably before the next record. If the registry
    /// flush fails the submission cannot be proven durable, so the record
    /// is classified as a system error rather than a success.
    fn finish_success(&mut self, record: &OrderRecord, amount: f64) {
        if let Err(e) = self
            .registry
            .record(&record.order_id, &record.business_date)
        {
            error!(
                "order {} submitted but registry flush failed: {}",
                record.order_id, e
            );
            self.stats.record_system_error();
            self.push_entry(
                record,
                RecordStatus::SystemError,
                &format!("registry_flush_failed: {}", e),
            );
            return;
        }

        info!("submitted order {}", record.order_id);
        self.stats.record_success(&record.currency, amount);
        self.push_entry(record, RecordStatus::Success, "Created");
    }

    fn push_entry(&mut self, record: &OrderRecord, status: RecordStatus, message: &str) {
        self.ledger.push(LedgerEntry {
            order_id: record.order_id.clone(),
            business_date: record.business_date.clone(),
            status,
            message: message.to_string(),
            timestamp_utc: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        });
    }
}
