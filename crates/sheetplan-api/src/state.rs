//! Shared handler state
use crate::metrics::Metrics;
use sheetplan_engine::{Orchestrator, QueueProcessor};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// `None` when no control spreadsheet is configured
    pub queue: Option<Arc<QueueProcessor>>,
    pub api_key: Arc<str>,
    pub metrics: Metrics,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, api_key: impl Into<Arc<str>>, metrics: Metrics) -> Self {
        Self {
            orchestrator,
            queue: None,
            api_key: api_key.into(),
            metrics,
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_queue(mut self, queue: Arc<QueueProcessor>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
