//! In-memory spreadsheet and sleeper for tests
use crate::{SheetsApi, SheetsError, Sleeper};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use sheetplan_core::{ValueRange, WriteEntry};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Ranges are matched by exact address string. Writes are stored under
/// their own address, so a later read of a wider range does not see them.
#[derive(Default)]
pub struct MemorySheetsApi {
    ranges: Mutex<HashMap<(String, String), Vec<Vec<Value>>>>,
    updates: Mutex<Vec<(String, Vec<WriteEntry>)>>,
    failures: Mutex<VecDeque<SheetsError>>,
    get_calls: Mutex<usize>,
}

impl MemorySheetsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(self, spreadsheet_id: &str, range: &str, values: Vec<Vec<Value>>) -> Self {
        self.set_range(spreadsheet_id, range, values);
        self
    }

    pub fn set_range(&self, spreadsheet_id: &str, range: &str, values: Vec<Vec<Value>>) {
        self.ranges
            .lock()
            .insert((spreadsheet_id.to_string(), range.to_string()), values);
    }

    pub fn range(&self, spreadsheet_id: &str, range: &str) -> Option<Vec<Vec<Value>>> {
        self.ranges
            .lock()
            .get(&(spreadsheet_id.to_string(), range.to_string()))
            .cloned()
    }

    /// Queue an error for the next call, read or write.
    pub fn fail_next(&self, error: SheetsError) {
        self.failures.lock().push_back(error);
    }

    /// Every successful `batch_update`, in call order.
    pub fn updates(&self) -> Vec<(String, Vec<WriteEntry>)> {
        self.updates.lock().clone()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().len()
    }

    /// Remote reads that reached this backend (cache hits do not).
    pub fn get_calls(&self) -> usize {
        *self.get_calls.lock()
    }

    fn take_failure(&self) -> Option<SheetsError> {
        self.failures.lock().pop_front()
    }
}

#[async_trait]
impl SheetsApi for MemorySheetsApi {
    async fn batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<ValueRange>, SheetsError> {
        *self.get_calls.lock() += 1;
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(ranges
            .iter()
            .map(|range| ValueRange {
                range: range.clone(),
                values: self.range(spreadsheet_id, range).unwrap_or_default(),
            })
            .collect())
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        writes: &[WriteEntry],
    ) -> Result<u64, SheetsError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        for write in writes {
            self.set_range(spreadsheet_id, &write.range, write.values.clone());
        }
        self.updates
            .lock()
            .push((spreadsheet_id.to_string(), writes.to_vec()));
        Ok(writes.iter().map(|w| w.cell_count() as u64).sum())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// Records requested waits and returns at once.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}
