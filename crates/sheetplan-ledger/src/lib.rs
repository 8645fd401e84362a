//! Sheetplan Ledger: Idempotency store
//!
//! One record per job id. `start` is the only compare-and-set that matters:
//! the first caller creates a RUNNING record, everybody else sees the
//! existing one. `done` and `fail` only move a record out of RUNNING, so a
//! terminal record never changes again.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryJobLedger;
#[cfg(feature = "postgres")]
pub use postgres::PgJobLedger;

use async_trait::async_trait;
use sheetplan_core::{CompletedJob, ErrorKind, JobRecord, JobResult};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("LEDGER/backend: {0}")]
    Backend(String),

    #[error("LEDGER/corrupt record for job '{job_id}': {detail}")]
    Corrupt { job_id: String, detail: String },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

/// What `start` found.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// This caller created the RUNNING record and owns the job
    Started,
    /// Someone got there first
    Existing(JobRecord),
}

#[async_trait]
pub trait JobLedger: Send + Sync {
    /// Result of a DONE job, if any.
    async fn get_done(&self, job_id: &str) -> Result<Option<CompletedJob>, LedgerError>;

    /// Create a RUNNING record unless one already exists.
    async fn start(&self, job_id: &str, payload_hash: &str) -> Result<StartOutcome, LedgerError>;

    /// RUNNING → DONE. `false` when there was no RUNNING record.
    async fn done(&self, job_id: &str, result: &JobResult) -> Result<bool, LedgerError>;

    /// RUNNING → ERROR. `false` when there was no RUNNING record.
    async fn fail(&self, job_id: &str, error: &str) -> Result<bool, LedgerError>;

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, LedgerError>;

    /// Backend name for logging
    fn backend_name(&self) -> &str;
}
