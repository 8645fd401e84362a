//! sheetplan core: data model, validation verdicts, audit trail and hashing.
//!
//! Every other sheetplan crate builds on the types defined here. Nothing in
//! this crate performs I/O.

pub mod audit;
pub mod data_model;
pub mod error;
pub mod hashing;
pub mod validation;

pub use audit::{
    AuditEvent, AuditSink, FanoutAuditSink, MemoryAuditSink, Severity, SharedAudit,
    TracingAuditSink,
};
pub use data_model::{
    CompletedJob, ComputedQuantities, Job, JobRecord, JobResult, JobStatus, Template, ValueRange,
    WriteEntry, WritePlan,
};
pub use error::ErrorKind;
pub use hashing::{canonical_json, payload_hash};
pub use validation::ValidationResult;

/// Version tag stamped on plans produced by this engine.
pub const SHEETPLAN_VERSION: &str = "1.0.0";
