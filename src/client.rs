//! HTTP submission client with retry and exponential backoff

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::order::OrderRecord;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

pub const API_VALIDATION_ERROR: &str = "api_validation_error";
pub const SYSTEM_ERROR_EXHAUSTED: &str = "system_error_exhausted";

/// Terminal result of one submission, retries already spent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Endpoint accepted the order (201, or 200 on idempotent replay)
    Submitted,
    /// Permanent business rejection; retrying would not help
    Rejected(String),
    /// Retries exhausted on transient failures
    Failed(String),
}

pub struct SubmissionClient {
    client: Client,
    endpoint: String,
    retry_attempts: u32,
    backoff_ms: u64,
}

impl SubmissionClient {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint_url(),
            retry_attempts: config.retry_attempts,
            backoff_ms: config.retry_backoff_ms,
        })
    }

    /// Submit one record, making up to `retry_attempts + 1` attempts.
    ///
    /// Backoff starts at the configured base and doubles after every
    /// retried attempt. Only transient failures (5xx or a connection-level
    /// error) are retried; any other non-success status is permanent.
    ///
    /// Connection-level errors are retried wholesale, without
    /// distinguishing timeouts from other client faults. This mirrors the
    /// deliberate retry-on-unknown-error policy of the acceptance flow.
    pub async fn submit(&self, record: &OrderRecord) -> SubmitOutcome {
        let total_attempts = self.retry_attempts + 1;
        let mut backoff = self.backoff_ms;
        let mut last_failure = String::new();

        for attempt in 1..=total_attempts {
            match self.attempt(record).await {
                Attempt::Accepted => return SubmitOutcome::Submitted,
                Attempt::Permanent(reason) => return SubmitOutcome::Rejected(reason),
                Attempt::Transient(detail) => last_failure = detail,
            }

            if attempt < total_attempts {
                warn!(
                    "retry {}/{} for order {}: sleeping {}ms ({})",
                    attempt, self.retry_attempts, record.order_id, backoff, last_failure
                );
                sleep(Duration::from_millis(backoff)).await;
                backoff = next_backoff(backoff);
            }
        }

        warn!(
            "giving up on order {} after {} attempts: {}",
            record.order_id, total_attempts, last_failure
        );
        SubmitOutcome::Failed(SYSTEM_ERROR_EXHAUSTED.to_string())
    }

    async fn attempt(&self, record: &OrderRecord) -> Attempt {
        let response = match self.client.post(&self.endpoint).json(record).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Transient(e.to_string()),
        };

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Attempt::Accepted,
            StatusCode::UNPROCESSABLE_ENTITY => {
                Attempt::Permanent(API_VALIDATION_ERROR.to_string())
            }
            status if status.is_server_error() => {
                Attempt::Transient(format!("server error {}", status.as_u16()))
            }
            status => Attempt::Permanent(format!("api_error_{}", status.as_u16())),
        }
    }
}

enum Attempt {
    Accepted,
    Permanent(String),
    Transient(String),
}

/// Double the backoff, saturating instead of overflowing when an extreme
/// retry budget pushes it past u64::MAX
fn next_backoff(backoff_ms: u64) -> u64 {
    backoff_ms.saturating_mul(2)
}
