//! Spreadsheet Client: cache + retry + audit around a [`SheetsApi`]
use crate::{RetryPolicy, SheetsApi, SheetsError, Sleeper, SnapshotCache, TokioSleeper};
use sheetplan_core::{AuditEvent, Severity, SharedAudit, ValueRange, WriteEntry};
use std::sync::Arc;
use std::time::Instant;

pub struct SpreadsheetClient {
    api: Arc<dyn SheetsApi>,
    cache: SnapshotCache<Vec<ValueRange>>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    audit: SharedAudit,
}

impl SpreadsheetClient {
    pub fn new(api: Arc<dyn SheetsApi>, audit: SharedAudit) -> Self {
        Self {
            api,
            cache: SnapshotCache::default(),
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            audit,
        }
    }

    pub fn with_cache(mut self, cache: SnapshotCache<Vec<ValueRange>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn cache(&self) -> &SnapshotCache<Vec<ValueRange>> {
        &self.cache
    }

    /// Read `ranges`, served from the cache while fresh.
    pub async fn batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<ValueRange>, SheetsError> {
        if ranges.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let key = SnapshotCache::<Vec<ValueRange>>::key(spreadsheet_id, ranges);

        if let Some(values) = self.cache.get(&key) {
            tracing::debug!(spreadsheet_id, ranges = ranges.len(), "snapshot cache hit");
            self.record("sheets.batch_get", spreadsheet_id, ranges.len(), 0, true, None, start);
            return Ok(values);
        }

        let api = self.api.as_ref();
        let outcome = self
            .retry
            .run(Arc::clone(&self.sleeper), move || api.batch_get(spreadsheet_id, ranges))
            .await;

        match outcome.result {
            Ok(values) => {
                self.cache.put(key, values.clone());
                self.record(
                    "sheets.batch_get",
                    spreadsheet_id,
                    ranges.len(),
                    outcome.attempts,
                    false,
                    None,
                    start,
                );
                Ok(values)
            }
            Err(err) => {
                self.record(
                    "sheets.batch_get",
                    spreadsheet_id,
                    ranges.len(),
                    outcome.attempts,
                    false,
                    Some(&err),
                    start,
                );
                Err(err)
            }
        }
    }

    /// Write literal values and drop every cached read of the spreadsheet.
    pub async fn batch_update(
        &self,
        spreadsheet_id: &str,
        writes: &[WriteEntry],
    ) -> Result<u64, SheetsError> {
        if writes.is_empty() {
            return Ok(0);
        }
        let start = Instant::now();
        let api = self.api.as_ref();
        let outcome = self
            .retry
            .run(Arc::clone(&self.sleeper), move || api.batch_update(spreadsheet_id, writes))
            .await;

        match outcome.result {
            Ok(updated) => {
                let dropped = self.cache.invalidate(spreadsheet_id);
                tracing::debug!(spreadsheet_id, updated, dropped, "batch update applied");
                self.record(
                    "sheets.batch_update",
                    spreadsheet_id,
                    writes.len(),
                    outcome.attempts,
                    false,
                    None,
                    start,
                );
                Ok(updated)
            }
            Err(err) => {
                self.record(
                    "sheets.batch_update",
                    spreadsheet_id,
                    writes.len(),
                    outcome.attempts,
                    false,
                    Some(&err),
                    start,
                );
                Err(err)
            }
        }
    }

    /// Force the next read of this spreadsheet to go remote.
    pub fn invalidate(&self, spreadsheet_id: &str) -> usize {
        self.cache.invalidate(spreadsheet_id)
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        action: &str,
        spreadsheet_id: &str,
        range_count: usize,
        attempts: u32,
        cache_hit: bool,
        error: Option<&SheetsError>,
        start: Instant,
    ) {
        let mut event = AuditEvent::new(action)
            .with_spreadsheet(spreadsheet_id)
            .with_data("backend", self.api.backend_name())
            .with_data("range_count", range_count)
            .with_data("attempts", attempts)
            .with_data("cache_hit", cache_hit)
            .since(start);
        event = match error {
            None => event.with_data("outcome", "ok"),
            Some(err) => event
                .with_severity(Severity::Error)
                .with_data("outcome", "error")
                .with_data("error", err.to_string()),
        };
        self.audit.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySheetsApi, RecordingSleeper};
    use serde_json::json;
    use sheetplan_core::MemoryAuditSink;
    use std::time::Duration;

    struct Fixture {
        api: Arc<MemorySheetsApi>,
        audit: Arc<MemoryAuditSink>,
        sleeper: Arc<RecordingSleeper>,
        client: SpreadsheetClient,
    }

    fn fixture(ttl: Duration) -> Fixture {
        let api = Arc::new(
            MemorySheetsApi::new().with_range("s1", "EPS_100!F3", vec![vec![json!("2024-05-01")]]),
        );
        let audit = Arc::new(MemoryAuditSink::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let client = SpreadsheetClient::new(api.clone(), audit.clone())
            .with_cache(SnapshotCache::new(ttl, 16))
            .with_sleeper(sleeper.clone());
        Fixture {
            api,
            audit,
            sleeper,
            client,
        }
    }

    fn ranges(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_second_read_is_cached() {
        let f = fixture(Duration::from_secs(300));
        let first = f.client.batch_get("s1", &ranges(&["EPS_100!F3"])).await.unwrap();
        let second = f.client.batch_get("s1", &ranges(&["EPS_100!F3"])).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(f.api.get_calls(), 1);

        let events = f.audit.entries();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data["cache_hit"], json!(false));
        assert_eq!(events[1].data["cache_hit"], json!(true));
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reads_remote() {
        let f = fixture(Duration::ZERO);
        f.client.batch_get("s1", &ranges(&["EPS_100!F3"])).await.unwrap();
        f.client.batch_get("s1", &ranges(&["EPS_100!F3"])).await.unwrap();
        assert_eq!(f.api.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_update_invalidates_spreadsheet() {
        let f = fixture(Duration::from_secs(300));
        f.client.batch_get("s1", &ranges(&["EPS_100!F3"])).await.unwrap();

        let updated = f
            .client
            .batch_update("s1", &[WriteEntry::single("EPS_100!F3", "2024-06-01")])
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert!(f.client.cache().is_empty());

        let fresh = f.client.batch_get("s1", &ranges(&["EPS_100!F3"])).await.unwrap();
        assert_eq!(fresh[0].values, vec![vec![json!("2024-06-01")]]);
        assert_eq!(f.api.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let f = fixture(Duration::from_secs(300));
        f.api.fail_next(SheetsError::status(503, "busy"));
        f.api.fail_next(SheetsError::status(503, "busy"));

        let values = f.client.batch_get("s1", &ranges(&["EPS_100!F3"])).await.unwrap();
        assert_eq!(values.len(), 1);

        let sleeps = f.sleeper.sleeps();
        assert_eq!(sleeps.len(), 2);
        assert!(sleeps[1] >= sleeps[0]);
        assert_eq!(f.audit.entries()[0].data["attempts"], json!(3));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_cache_and_audits_error() {
        let f = fixture(Duration::from_secs(300));
        f.client.batch_get("s1", &ranges(&["EPS_100!F3"])).await.unwrap();
        f.api.fail_next(SheetsError::status(400, "bad range"));

        let err = f
            .client
            .batch_update("s1", &[WriteEntry::single("EPS_100!F3", 1)])
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), Some(400));
        assert_eq!(f.client.cache().len(), 1);
        assert_eq!(f.api.update_count(), 0);

        let last = f.audit.entries().pop().unwrap();
        assert_eq!(last.action, "sheets.batch_update");
        assert_eq!(last.severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_empty_requests_skip_backend() {
        let f = fixture(Duration::from_secs(300));
        assert!(f.client.batch_get("s1", &[]).await.unwrap().is_empty());
        assert_eq!(f.client.batch_update("s1", &[]).await.unwrap(), 0);
        assert_eq!(f.api.get_calls(), 0);
        assert!(f.audit.is_empty());
    }
}
