//! Error responses
//!
//! Every failure becomes `{job_id?, status: "ERROR", applied: false, kind,
//! errors, rejected_range?}` with a status code chosen by error kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use sheetplan_core::ErrorKind;
use sheetplan_engine::FillError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: ErrorKind,
    job_id: Option<String>,
    errors: Vec<String>,
    rejected_range: Option<String>,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Authorization => StatusCode::UNAUTHORIZED,
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Configuration | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn new(kind: ErrorKind, errors: Vec<String>) -> Self {
        Self {
            status: status_for(kind),
            kind,
            job_id: None,
            errors,
            rejected_range: None,
        }
    }

    pub fn fill(job_id: &str, err: &FillError) -> Self {
        let rejected_range = match err {
            FillError::Validation { rejected_range, .. } => rejected_range.clone(),
            _ => None,
        };
        Self {
            job_id: Some(job_id.to_string()),
            rejected_range,
            ..Self::new(err.kind(), err.errors())
        }
    }

    /// Queue-level failure; not tied to one job.
    pub fn queue(err: &FillError) -> Self {
        Self::new(err.kind(), err.errors())
    }

    pub fn unauthorized() -> Self {
        Self::new(
            ErrorKind::Authorization,
            vec!["AUTH/missing or invalid x-api-key".to_string()],
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, vec![message.into()])
    }

    pub fn timeout(job_id: &str, after_secs: f64) -> Self {
        Self {
            job_id: Some(job_id.to_string()),
            ..Self::new(
                ErrorKind::Timeout,
                vec![format!(
                    "TIMEOUT/request exceeded {}s; the job keeps running, resubmit the same job_id for its result",
                    after_secs
                )],
            )
        }
    }

    pub fn queue_disabled() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            ..Self::new(
                ErrorKind::Configuration,
                vec!["CONFIG/queue processing is disabled: no control spreadsheet configured".to_string()],
            )
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, vec![message.into()])
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn body(&self) -> Value {
        let mut body = json!({
            "status": "ERROR",
            "applied": false,
            "kind": self.kind.code(),
            "errors": self.errors,
        });
        if let Some(job_id) = &self.job_id {
            body["job_id"] = json!(job_id);
        }
        if let Some(range) = &self.rejected_range {
            body["rejected_range"] = json!(range);
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}
