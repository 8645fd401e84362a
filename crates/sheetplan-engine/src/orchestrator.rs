//! Orchestrator: `fill(job)`
//!
//! ```text
//! get_done ─ hit ──────────────────────────────────────────→ replay
//!    │ miss
//! start ─ existing ─→ RUNNING: conflict │ ERROR: conflict │ DONE: replay
//!    │ started
//! template → snapshot → planner → guard + domain checks ─ invalid ─→ fail
//!    │ valid
//! dry_run ? done(0) : batch_update → done(N)
//! ```
//!
//! Every failure after `start` is recorded with `fail`, except a ledger
//! failure after a successful write: that job stays RUNNING so its id is
//! never executed twice. Nothing inside `fill` retries a whole job; only
//! individual spreadsheet calls and the final `done` retry.

use crate::domain_checks;
use crate::FillError;
use backon::{ExponentialBuilder, Retryable};
use serde::Serialize;
use sheetplan_core::{
    payload_hash, AuditEvent, CompletedJob, Job, JobResult, JobStatus, Severity, SharedAudit,
    Template, ValidationResult, WritePlan,
};
use sheetplan_guard::{validate_writes, Allowlist};
use sheetplan_ledger::{JobLedger, LedgerError, StartOutcome};
use sheetplan_planner::Planner;
use sheetplan_registry::TemplateRegistry;
use sheetplan_sheets::SpreadsheetClient;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Attempts at marking an applied job DONE before giving up.
const DONE_ATTEMPTS: usize = 3;

pub const REPLAY_NOTE: &str = "idempotent replay: job already completed";

/// What a successful `fill` returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillOutcome {
    pub job_id: String,
    pub status: JobStatus,
    /// `true` only when this call wrote to the spreadsheet
    pub applied: bool,
    pub writes_count: usize,
    pub total_updated_cells: u64,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_plan: Option<WritePlan>,
    #[serde(skip)]
    pub replayed: bool,
}

pub struct Orchestrator {
    templates: Arc<TemplateRegistry>,
    sheets: Arc<SpreadsheetClient>,
    planner: Arc<dyn Planner>,
    ledger: Arc<dyn JobLedger>,
    audit: SharedAudit,
}

impl Orchestrator {
    pub fn new(
        templates: Arc<TemplateRegistry>,
        sheets: Arc<SpreadsheetClient>,
        planner: Arc<dyn Planner>,
        ledger: Arc<dyn JobLedger>,
        audit: SharedAudit,
    ) -> Self {
        Self {
            templates,
            sheets,
            planner,
            ledger,
            audit,
        }
    }

    pub fn sheets(&self) -> &Arc<SpreadsheetClient> {
        &self.sheets
    }

    pub fn ledger(&self) -> &Arc<dyn JobLedger> {
        &self.ledger
    }

    pub async fn fill(&self, job: &Job) -> Result<FillOutcome, FillError> {
        check_job(job)?;
        let hash = payload_hash(&job.payload);

        if let Some(completed) = self.ledger.get_done(&job.job_id).await? {
            return Ok(self.replay(job, completed, &hash));
        }

        match self.ledger.start(&job.job_id, &hash).await? {
            StartOutcome::Started => {}
            StartOutcome::Existing(record) => {
                return match record.status {
                    JobStatus::Running => Err(FillError::JobInProgress(job.job_id.clone())),
                    JobStatus::Error => Err(FillError::JobFailed(job.job_id.clone())),
                    JobStatus::Done => {
                        let completed = record.completed().ok_or_else(|| LedgerError::Corrupt {
                            job_id: job.job_id.clone(),
                            detail: "DONE record without a result".to_string(),
                        })?;
                        Ok(self.replay(job, completed, &hash))
                    }
                };
            }
        }

        let start = Instant::now();
        tracing::info!(job_id = %job.job_id, template_id = %job.template_id, dry_run = job.dry_run, "fill started");

        match self.execute(job).await {
            Ok(outcome) => {
                let action = if outcome.applied { "fill.applied" } else { "fill.dry_run" };
                self.audit.emit(
                    self.event(action, job)
                        .with_data("writes_count", outcome.writes_count)
                        .with_data("total_updated_cells", outcome.total_updated_cells)
                        .since(start),
                );
                Ok(outcome)
            }
            Err(err @ FillError::Unrecorded { .. }) => {
                tracing::error!(job_id = %job.job_id, error = %err, "applied job left RUNNING");
                self.audit.emit(
                    self.event("fill.unrecorded", job)
                        .with_severity(Severity::Error)
                        .with_data("kind", err.kind().code())
                        .with_data("errors", err.errors())
                        .since(start),
                );
                Err(err)
            }
            Err(err) => {
                self.record_failure(job, &err, start).await;
                Err(err)
            }
        }
    }

    async fn execute(&self, job: &Job) -> Result<FillOutcome, FillError> {
        let template = self
            .templates
            .get(&job.template_id)
            .ok_or_else(|| FillError::TemplateNotFound(job.template_id.clone()))?;

        let snapshot = self
            .sheets
            .batch_get(&job.spreadsheet_id, &template.read_ranges)
            .await?;

        let plan = self.planner.plan(job, &template, &snapshot).await?;

        let verdict = verify_plan(job, &template, &plan);
        if !verdict.valid {
            return Err(FillError::Validation {
                rejected_range: verdict
                    .details
                    .get("rejected_range")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                errors: verdict.errors,
            });
        }
        let notes = notes_with_warnings(&plan.notes, &verdict.warnings);
        let writes_count = plan.writes.len();

        if job.dry_run {
            self.finish(&job.job_id, &JobResult::dry_run(writes_count))
                .await?;
            return Ok(FillOutcome {
                job_id: job.job_id.clone(),
                status: JobStatus::Done,
                applied: false,
                writes_count,
                total_updated_cells: 0,
                notes,
                write_plan: Some(plan),
                replayed: false,
            });
        }

        let updated = self
            .sheets
            .batch_update(&job.spreadsheet_id, &plan.writes)
            .await?;
        self.finish_applied(&job.job_id, &JobResult::applied(updated, writes_count))
            .await?;

        Ok(FillOutcome {
            job_id: job.job_id.clone(),
            status: JobStatus::Done,
            applied: true,
            writes_count,
            total_updated_cells: updated,
            notes,
            write_plan: Some(plan),
            replayed: false,
        })
    }

    async fn finish(&self, job_id: &str, result: &JobResult) -> Result<(), FillError> {
        if !self.ledger.done(job_id, result).await? {
            tracing::warn!(job_id, "job left RUNNING before it could be marked DONE");
        }
        Ok(())
    }

    /// `done` after the spreadsheet was written. Backend errors are retried
    /// briefly; if they persist the job must not be marked ERROR.
    async fn finish_applied(&self, job_id: &str, result: &JobResult) -> Result<(), FillError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(50))
            .with_max_delay(Duration::from_millis(500))
            .with_max_times(DONE_ATTEMPTS - 1);
        let marked = (|| self.ledger.done(job_id, result))
            .retry(backoff)
            .when(|err: &LedgerError| matches!(err, LedgerError::Backend(_)))
            .notify(|err: &LedgerError, wait: Duration| {
                tracing::warn!(job_id, error = %err, wait_ms = wait.as_millis() as u64, "retrying done");
            })
            .await;

        match marked {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!(job_id, "job left RUNNING before it could be marked DONE");
                Ok(())
            }
            Err(source) => Err(FillError::Unrecorded {
                job_id: job_id.to_string(),
                updated_cells: result.total_updated_cells,
                source,
            }),
        }
    }

    /// A changed payload under a reused job id still gets the original
    /// result; the mismatch is reported, never re-executed.
    fn replay(&self, job: &Job, completed: CompletedJob, hash: &str) -> FillOutcome {
        let mismatch = completed.payload_hash != hash;
        let mut notes = REPLAY_NOTE.to_string();
        let mut event = self
            .event("fill.replayed", job)
            .with_data("payload_hash_matches", !mismatch);
        if mismatch {
            notes.push_str("; payload differs from the original submission and was ignored");
            event = event.with_severity(Severity::Warning);
            tracing::warn!(job_id = %job.job_id, "replayed job with a different payload");
        }
        self.audit.emit(event);

        FillOutcome {
            job_id: job.job_id.clone(),
            status: JobStatus::Done,
            applied: false,
            writes_count: completed.result.writes_count,
            total_updated_cells: completed.result.total_updated_cells,
            notes,
            write_plan: None,
            replayed: true,
        }
    }

    async fn record_failure(&self, job: &Job, err: &FillError, start: Instant) {
        let message = err.to_string();
        match self.ledger.fail(&job.job_id, &message).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(job_id = %job.job_id, "failed job was no longer RUNNING"),
            Err(ledger_err) => {
                tracing::error!(job_id = %job.job_id, error = %ledger_err, "could not record failure")
            }
        }

        let action = match err.kind() {
            sheetplan_core::ErrorKind::Validation => "fill.rejected",
            _ => "fill.failed",
        };
        tracing::warn!(job_id = %job.job_id, kind = %err.kind(), error = %message, "fill did not complete");
        self.audit.emit(
            self.event(action, job)
                .with_severity(Severity::Error)
                .with_data("kind", err.kind().code())
                .with_data("errors", err.errors())
                .since(start),
        );
    }

    fn event(&self, action: &str, job: &Job) -> AuditEvent {
        AuditEvent::new(action)
            .with_job(&job.job_id)
            .with_template(&job.template_id)
            .with_spreadsheet(&job.spreadsheet_id)
            .with_data("dry_run", job.dry_run)
    }
}

fn check_job(job: &Job) -> Result<(), FillError> {
    for (field, value) in [
        ("job_id", &job.job_id),
        ("template_id", &job.template_id),
        ("spreadsheet_id", &job.spreadsheet_id),
    ] {
        if value.trim().is_empty() {
            return Err(FillError::InvalidJob(format!("{} is empty", field)));
        }
    }
    Ok(())
}

/// Allowlist + formula scan, then domain rules.
pub fn verify_plan(job: &Job, template: &Template, plan: &WritePlan) -> ValidationResult {
    let allowlist = Allowlist::from_template(template);
    validate_writes(&plan.writes, &allowlist).merge(domain_checks::check_plan(job, plan))
}

fn notes_with_warnings(notes: &str, warnings: &[String]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if !notes.trim().is_empty() {
        parts.push(notes.trim());
    }
    parts.extend(warnings.iter().map(String::as_str));
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_with_warnings() {
        assert_eq!(notes_with_warnings("", &[]), "");
        assert_eq!(
            notes_with_warnings(" plan ok ", &["SPAN/tight".to_string()]),
            "plan ok\nSPAN/tight"
        );
        assert_eq!(notes_with_warnings("", &["A".to_string()]), "A");
    }

    #[test]
    fn test_check_job_rejects_blank_ids() {
        let job = Job {
            job_id: " ".to_string(),
            template_id: "t".to_string(),
            spreadsheet_id: "s".to_string(),
            payload: serde_json::Value::Null,
            dry_run: false,
        };
        assert!(matches!(check_job(&job), Err(FillError::InvalidJob(_))));
    }
}
