//! In-process ledger backed by a concurrent map
use crate::{JobLedger, LedgerError, StartOutcome};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sheetplan_core::{CompletedJob, JobRecord, JobResult, JobStatus};

/// Records live as long as the process. Shard locks are held only inside
/// each call, never across an `.await`.
#[derive(Default)]
pub struct MemoryJobLedger {
    records: DashMap<String, JobRecord>,
}

impl MemoryJobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn finish(&self, job_id: &str, apply: impl FnOnce(&mut JobRecord)) -> bool {
        match self.records.get_mut(job_id) {
            Some(mut record) if record.status == JobStatus::Running => {
                apply(&mut record);
                record.updated_at = Utc::now();
                true
            }
            Some(record) => {
                tracing::warn!(job_id, status = %record.status, "ignoring transition of finished job");
                false
            }
            None => {
                tracing::warn!(job_id, "ignoring transition of unknown job");
                false
            }
        }
    }
}

#[async_trait]
impl JobLedger for MemoryJobLedger {
    async fn get_done(&self, job_id: &str) -> Result<Option<CompletedJob>, LedgerError> {
        Ok(self.records.get(job_id).and_then(|r| r.completed()))
    }

    async fn start(&self, job_id: &str, payload_hash: &str) -> Result<StartOutcome, LedgerError> {
        match self.records.entry(job_id.to_string()) {
            Entry::Occupied(existing) => Ok(StartOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(JobRecord::running(job_id, payload_hash));
                Ok(StartOutcome::Started)
            }
        }
    }

    async fn done(&self, job_id: &str, result: &JobResult) -> Result<bool, LedgerError> {
        Ok(self.finish(job_id, |record| {
            record.status = JobStatus::Done;
            record.result = Some(result.clone());
        }))
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<bool, LedgerError> {
        Ok(self.finish(job_id, |record| {
            record.status = JobStatus::Error;
            record.error = Some(error.to_string());
        }))
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, LedgerError> {
        Ok(self.records.get(job_id).map(|r| r.clone()))
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
