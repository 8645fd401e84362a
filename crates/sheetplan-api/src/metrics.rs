//! Prometheus counters served at `/metrics`.
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use sheetplan_engine::QueueSummary;

/// Registry plus the counters registered in it. Cheap to clone.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    fills: IntCounterVec,
    queue_rows: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let fills = IntCounterVec::new(
            Opts::new("sheetplan_fill_total", "Fill requests by outcome"),
            &["outcome"],
        )?;
        let queue_rows = IntCounterVec::new(
            Opts::new("sheetplan_queue_rows_total", "Queue rows processed by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(fills.clone()))?;
        registry.register(Box::new(queue_rows.clone()))?;
        Ok(Self {
            registry,
            fills,
            queue_rows,
        })
    }

    /// `outcome` is `applied`, `dry_run`, `replayed` or a lowercase error kind.
    pub fn record_fill(&self, outcome: &str) {
        self.fills.with_label_values(&[outcome]).inc();
    }

    pub fn record_queue(&self, summary: &QueueSummary) {
        self.queue_rows
            .with_label_values(&["succeeded"])
            .inc_by(summary.succeeded as u64);
        self.queue_rows
            .with_label_values(&["failed"])
            .inc_by(summary.failed as u64);
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_exposed() {
        let metrics = Metrics::new().unwrap();
        metrics.record_fill("applied");
        metrics.record_fill("applied");
        metrics.record_queue(&QueueSummary {
            processed: 3,
            succeeded: 2,
            failed: 1,
        });

        let text = metrics.encode().unwrap();
        assert!(text.contains("sheetplan_fill_total{outcome=\"applied\"} 2"));
        assert!(text.contains("sheetplan_queue_rows_total{outcome=\"failed\"} 1"));
    }
}
