//! # Orderflow
//!
//! Batch order ingestion pipeline: reads delimited order rows, validates
//! them against business rules and a customer reference dataset, submits
//! valid orders to an acceptance endpoint with retry and exponential
//! backoff, and writes idempotent, auditable outputs. Safe to run
//! repeatedly over overlapping input; orders accepted by a prior run are
//! skipped, never resubmitted.
//!
//! ## Modules
//!
//! - `config` - Typed, validated runtime configuration
//! - `reference` - Customer reference dataset lookup
//! - `registry` - Durable idempotency registry, flushed after every success
//! - `validate` - Per-record business validation rules
//! - `client` - Retrying HTTP submission client
//! - `pipeline` - Per-record orchestration and run statistics
//! - `report` - Ledger, summary, and checksum manifest output
//! - `serve` - Stand-in order acceptance endpoint
pub mod client;
pub mod config;
pub mod error;
pub mod order;
pub mod pipeline;
pub mod reference;
pub mod registry;
pub mod report;
pub mod serve;
pub mod validate;
