//! Sheetplan API /v1: REST endpoints
//!
//! | Route | Auth |
//! |---|---|
//! | `POST /v1/fill` | `x-api-key` |
//! | `POST /v1/queue/process` | `x-api-key` |
//! | `GET /healthz` | none |
//! | `GET /metrics` | none |

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod state;

pub use error::ApiError;
pub use metrics::Metrics;
pub use state::AppState;

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/v1/fill", post(handlers::fill))
        .route("/v1/queue/process", post(handlers::process_queue))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ));

    let public = Router::new()
        .route("/healthz", get(handlers::health))
        .route("/metrics", get(handlers::metrics));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
