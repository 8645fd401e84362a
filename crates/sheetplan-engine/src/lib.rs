//! Sheetplan Engine: Fill orchestration
//!
//! Wires the planner, guard, validators, ledger and spreadsheet client into
//! the one job type the system runs: fill a template from a payload.
//!
//! # Flow
//!
//! ```text
//! Job → Ledger.start → Planner → Guard + Domain checks → Sheets → Ledger.done
//! ```

pub mod domain_checks;
mod error;
pub mod orchestrator;
pub mod queue;
pub mod settings;

pub use error::FillError;
pub use orchestrator::{verify_plan, FillOutcome, Orchestrator, REPLAY_NOTE};
pub use queue::{QueueProcessor, QueueSummary, DEFAULT_QUEUE_RANGE};
pub use settings::{ConfigError, LedgerBackend, LogFormat, Secret, Settings};
