//! Spreadsheet backend seam
use crate::SheetsError;
use async_trait::async_trait;
use sheetplan_core::{ValueRange, WriteEntry};

/// Raw access to a spreadsheet service. No caching, no retries: the
/// [`SpreadsheetClient`](crate::SpreadsheetClient) adds both.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// One [`ValueRange`] per requested range, in request order.
    async fn batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<ValueRange>, SheetsError>;

    /// Write literal values; returns the number of cells updated.
    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        writes: &[WriteEntry],
    ) -> Result<u64, SheetsError>;

    /// Backend name for logging
    fn backend_name(&self) -> &str;
}
