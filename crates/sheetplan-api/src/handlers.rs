//! API Handlers
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sheetplan_core::{Job, SHEETPLAN_VERSION};
use sheetplan_engine::{FillOutcome, QueueSummary};

pub const MAX_QUEUE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct QueueRequest {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// POST /v1/fill
///
/// The fill runs on its own task: when the request times out the job still
/// finishes and records its result, so resubmitting the same `job_id`
/// replays it.
pub async fn fill(
    State(state): State<AppState>,
    body: Result<Json<Job>, JsonRejection>,
) -> Result<Json<FillOutcome>, ApiError> {
    let Json(job) = body.map_err(|e| ApiError::validation(format!("REQUEST/{}", e.body_text())))?;

    let orchestrator = state.orchestrator.clone();
    let task_job = job.clone();
    let task = tokio::spawn(async move { orchestrator.fill(&task_job).await });

    let outcome = match tokio::time::timeout(state.request_timeout, task).await {
        Err(_) => {
            tracing::warn!(job_id = %job.job_id, "fill request timed out");
            state.metrics.record_fill("timeout");
            return Err(ApiError::timeout(
                &job.job_id,
                state.request_timeout.as_secs_f64(),
            ));
        }
        Ok(Err(join_err)) => {
            tracing::error!(job_id = %job.job_id, error = %join_err, "fill task aborted");
            state.metrics.record_fill("internal");
            return Err(ApiError::internal(format!("INTERNAL/fill task aborted: {}", join_err)));
        }
        Ok(Ok(result)) => result,
    };

    match outcome {
        Ok(outcome) => {
            let label = if outcome.replayed {
                "replayed"
            } else if outcome.applied {
                "applied"
            } else {
                "dry_run"
            };
            state.metrics.record_fill(label);
            Ok(Json(outcome))
        }
        Err(err) => {
            state
                .metrics
                .record_fill(&err.kind().code().to_ascii_lowercase());
            Err(ApiError::fill(&job.job_id, &err))
        }
    }
}

/// POST /v1/queue/process
pub async fn process_queue(
    State(state): State<AppState>,
    body: Result<Json<QueueRequest>, JsonRejection>,
) -> Result<Json<QueueSummary>, ApiError> {
    let Json(request) =
        body.map_err(|e| ApiError::validation(format!("REQUEST/{}", e.body_text())))?;
    if !(1..=MAX_QUEUE_LIMIT).contains(&request.limit) {
        return Err(ApiError::validation(format!(
            "REQUEST/limit must be between 1 and {}, got {}",
            MAX_QUEUE_LIMIT, request.limit
        )));
    }
    let queue = state.queue.as_ref().ok_or_else(ApiError::queue_disabled)?;

    let summary = queue.process(request.limit).await.map_err(|err| {
        tracing::error!(error = %err, "queue processing failed");
        ApiError::queue(&err)
    })?;
    state.metrics.record_queue(&summary);
    Ok(Json(summary))
}

/// GET /healthz
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": SHEETPLAN_VERSION }))
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => ApiError::internal(format!("INTERNAL/metrics encoding failed: {}", err))
            .into_response(),
    }
}
