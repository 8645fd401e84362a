//! Sheetplan Sheets: Spreadsheet access
//!
//! [`SpreadsheetClient`] wraps a [`SheetsApi`] backend with a TTL snapshot
//! cache, a bounded retry policy and one audit event per call.
//! [`GoogleSheetsApi`] talks to the Google Sheets REST API.

pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod google;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod retry;

pub use api::SheetsApi;
pub use cache::SnapshotCache;
pub use client::SpreadsheetClient;
pub use error::SheetsError;
pub use google::GoogleSheetsApi;
#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemorySheetsApi, RecordingSleeper};
pub use retry::{Attempted, RetryPolicy, Sleeper, TokioSleeper};
