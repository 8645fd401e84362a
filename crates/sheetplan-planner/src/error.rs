//! Planner errors
use sheetplan_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("LLM/request failed: {0}")]
    Transport(String),

    #[error("LLM/provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM/empty response")]
    EmptyResponse,

    #[error("PROMPT/{0}")]
    Prompt(String),

    #[error("SCHEMA/{0}")]
    Schema(String),

    #[error("SCHEMA/plan is for job '{found}', expected '{expected}'")]
    JobMismatch { expected: String, found: String },
}

impl PlannerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlannerError::Schema(_) | PlannerError::JobMismatch { .. } => ErrorKind::Validation,
            PlannerError::Status { status: 401, .. } | PlannerError::Status { status: 403, .. } => {
                ErrorKind::Configuration
            }
            PlannerError::Prompt(_) => ErrorKind::Internal,
            _ => ErrorKind::Upstream,
        }
    }
}
