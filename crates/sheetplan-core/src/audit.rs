//! Audit trail
//!
//! Append-only structured events describing what each component did, with
//! elapsed time and severity. Events are written once and consumed by log
//! aggregation; nothing in sheetplan queries them back except tests.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tracing target for audit events.
pub const AUDIT_TARGET: &str = "sheetplan::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// An audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,

    /// What happened (ex: "sheets.batch_get", "fill.applied")
    pub action: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,

    pub timestamp: DateTime<Utc>,

    pub elapsed_ms: u64,

    pub severity: Severity,

    #[serde(default)]
    pub data: Map<String, Value>,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            action: action.into(),
            job_id: None,
            spreadsheet_id: None,
            template_id: None,
            timestamp: Utc::now(),
            elapsed_ms: 0,
            severity: Severity::Info,
            data: Map::new(),
        }
    }

    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_spreadsheet(mut self, spreadsheet_id: impl Into<String>) -> Self {
        self.spreadsheet_id = Some(spreadsheet_id.into());
        self
    }

    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = elapsed.as_millis() as u64;
        self
    }

    /// Elapsed time measured from `start` to now.
    pub fn since(self, start: Instant) -> Self {
        self.with_elapsed(start.elapsed())
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

pub type SharedAudit = Arc<dyn AuditSink>;

/// Writes each event as a structured `tracing` event on [`AUDIT_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let data = Value::Object(event.data.clone());
        let job_id = event.job_id.as_deref().unwrap_or("-");
        let spreadsheet_id = event.spreadsheet_id.as_deref().unwrap_or("-");
        let template_id = event.template_id.as_deref().unwrap_or("-");

        macro_rules! audit_event {
            ($level:expr) => {
                tracing::event!(
                    target: AUDIT_TARGET,
                    $level,
                    event_id = %event.event_id,
                    action = %event.action,
                    job_id,
                    spreadsheet_id,
                    template_id,
                    elapsed_ms = event.elapsed_ms,
                    data = %data,
                    "audit"
                )
            };
        }

        match event.severity {
            Severity::Debug => audit_event!(tracing::Level::DEBUG),
            Severity::Info => audit_event!(tracing::Level::INFO),
            Severity::Warning => audit_event!(tracing::Level::WARN),
            Severity::Error => audit_event!(tracing::Level::ERROR),
        }
    }
}

/// Bounded in-memory collector, oldest entries dropped first.
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEvent>>,
    max_entries: usize,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::with_max_entries(10_000)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_entries: max,
        }
    }

    pub fn entries(&self) -> Vec<AuditEvent> {
        self.entries.lock().clone()
    }

    pub fn entries_for_job(&self, job_id: &str) -> Vec<AuditEvent> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.job_id.as_deref() == Some(job_id))
            .cloned()
            .collect()
    }

    /// Action names in emission order.
    pub fn actions(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.action.clone()).collect()
    }

    pub fn count_action(&self, action: &str) -> usize {
        self.entries.lock().iter().filter(|e| e.action == action).count()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Export to JSON Lines
    pub fn to_jsonl(&self) -> String {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        let mut entries = self.entries.lock();
        entries.push(event);
        if entries.len() > self.max_entries {
            let drain_count = entries.len() - self.max_entries;
            entries.drain(0..drain_count);
        }
    }
}

/// Sends every event to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutAuditSink {
    sinks: Vec<SharedAudit>,
}

impl FanoutAuditSink {
    pub fn new(sinks: Vec<SharedAudit>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: SharedAudit) {
        self.sinks.push(sink);
    }
}

impl AuditSink for FanoutAuditSink {
    fn emit(&self, event: AuditEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = AuditEvent::new("fill.applied")
            .with_job("job-123")
            .with_spreadsheet("sheet-1")
            .with_template("tpl")
            .with_elapsed(Duration::from_millis(42))
            .with_severity(Severity::Warning)
            .with_data("cells", 3);

        assert_eq!(event.job_id.as_deref(), Some("job-123"));
        assert_eq!(event.spreadsheet_id.as_deref(), Some("sheet-1"));
        assert_eq!(event.template_id.as_deref(), Some("tpl"));
        assert_eq!(event.elapsed_ms, 42);
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.data["cells"], serde_json::json!(3));
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn test_memory_sink_filters_by_job() {
        let sink = MemoryAuditSink::new();
        sink.emit(AuditEvent::new("a").with_job("J1"));
        sink.emit(AuditEvent::new("b").with_job("J2"));
        sink.emit(AuditEvent::new("c").with_job("J1"));

        assert_eq!(sink.len(), 3);
        let j1: Vec<_> = sink.entries_for_job("J1").into_iter().map(|e| e.action).collect();
        assert_eq!(j1, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(sink.count_action("b"), 1);
    }

    #[test]
    fn test_memory_sink_max_entries() {
        let sink = MemoryAuditSink::with_max_entries(5);
        for i in 0..10 {
            sink.emit(AuditEvent::new(format!("op{}", i)));
        }
        assert_eq!(sink.len(), 5);
        assert_eq!(sink.actions()[0], "op5");
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = Arc::new(MemoryAuditSink::new());
        let b = Arc::new(MemoryAuditSink::new());
        let fanout = FanoutAuditSink::new(vec![a.clone(), b.clone(), Arc::new(TracingAuditSink)]);
        fanout.emit(AuditEvent::new("x"));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_jsonl_export() {
        let sink = MemoryAuditSink::new();
        sink.emit(AuditEvent::new("one"));
        sink.emit(AuditEvent::new("two"));
        let jsonl = sink.to_jsonl();
        assert_eq!(jsonl.lines().count(), 2);
        assert!(jsonl.contains("\"action\":\"one\""));
    }
}
