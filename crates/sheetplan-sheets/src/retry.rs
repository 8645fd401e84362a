//! Retry policy for spreadsheet calls
//!
//! Exponential backoff built on `backon`. The first wait is `min_wait`, each
//! following wait is the previous one times `factor`, capped at `max_wait`.
//! With jitter on, each wait is stretched by a random amount below itself, so
//! a later wait is never shorter than an earlier one while `factor >= 2`.

use crate::SheetsError;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Where the policy waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub factor: f32,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(20),
            factor: 2.0,
            jitter: true,
        }
    }
}

/// Final result of a retried call plus how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, SheetsError>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_wait_bounds(mut self, min_wait: Duration, max_wait: Duration) -> Self {
        self.min_wait = min_wait;
        self.max_wait = max_wait.max(min_wait);
        self
    }

    pub fn with_factor(mut self, factor: f32) -> Self {
        self.factor = factor.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.min_wait)
            .with_max_delay(self.max_wait)
            .with_factor(self.factor)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out. Exhaustion wraps the last error in
    /// [`SheetsError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, sleeper: Arc<dyn Sleeper>, mut op: F) -> Attempted<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SheetsError>>,
    {
        let attempts = AtomicU32::new(0);
        let counted = || {
            attempts.fetch_add(1, Ordering::SeqCst);
            op()
        };

        let result = counted
            .retry(self.backoff())
            .sleep(sleep_with(sleeper))
            .when(SheetsError::is_retryable)
            .notify(|err: &SheetsError, wait: Duration| {
                tracing::warn!(
                    attempt = attempts.load(Ordering::SeqCst),
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "retrying spreadsheet call"
                );
            })
            .await;

        let attempts = attempts.load(Ordering::SeqCst);
        let result = match result {
            Err(err) if err.is_retryable() => Err(SheetsError::RetriesExhausted {
                attempts,
                source: Box::new(err),
            }),
            other => other,
        };
        Attempted { result, attempts }
    }
}

/// Built outside the generic `run` so the closure type does not carry the
/// caller's lifetimes.
fn sleep_with(
    sleeper: Arc<dyn Sleeper>,
) -> impl Fn(Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> + 'static {
    move |wait: Duration| {
        let sleeper = Arc::clone(&sleeper);
        Box::pin(async move { sleeper.sleep(wait).await })
    }
}
