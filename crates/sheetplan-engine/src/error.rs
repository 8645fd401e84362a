//! Fill errors
//!
//! Every crate-level error folds into [`FillError`]; callers branch on
//! [`FillError::kind`] rather than on variants.

use sheetplan_core::ErrorKind;
use sheetplan_ledger::LedgerError;
use sheetplan_planner::PlannerError;
use sheetplan_sheets::SheetsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FillError {
    #[error("VALIDATION/{}", .errors.join("; "))]
    Validation {
        errors: Vec<String>,
        /// First range the plan was not allowed to write, if that was the cause
        rejected_range: Option<String>,
    },

    #[error("VALIDATION/invalid job: {0}")]
    InvalidJob(String),

    #[error("CONFIG/unknown template '{0}'")]
    TemplateNotFound(String),

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("CONFLICT/job '{0}' is already running")]
    JobInProgress(String),

    #[error("CONFLICT/job '{0}' already failed; resubmit under a new job_id")]
    JobFailed(String),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Sheets(#[from] SheetsError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The spreadsheet was written but the job could not be marked DONE.
    /// The record stays RUNNING so the job id is never re-executed.
    #[error("INTERNAL/job '{job_id}' updated {updated_cells} cells but was not recorded as done: {source}")]
    Unrecorded {
        job_id: String,
        updated_cells: u64,
        #[source]
        source: LedgerError,
    },
}

impl FillError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FillError::Validation { .. } | FillError::InvalidJob(_) => ErrorKind::Validation,
            FillError::TemplateNotFound(_) | FillError::Config(_) => ErrorKind::Configuration,
            FillError::JobInProgress(_) | FillError::JobFailed(_) => ErrorKind::Conflict,
            FillError::Planner(e) => e.kind(),
            FillError::Sheets(e) => e.kind(),
            FillError::Ledger(e) => e.kind(),
            FillError::Unrecorded { .. } => ErrorKind::Internal,
        }
    }

    /// Individual problems, for response bodies and queue notes.
    pub fn errors(&self) -> Vec<String> {
        match self {
            FillError::Validation { errors, .. } => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}
