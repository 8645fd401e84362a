//! Queue Processor
//!
//! A control sheet lists jobs one per row:
//!
//! ```text
//! A: job_id | B: status | C: template_id | D: spreadsheet_id | E: payload_json | F: result_json
//! ```
//!
//! Rows whose status is `pending` (any case) are processed in sheet order,
//! up to a limit. Each row is marked `running` first, then `done` or
//! `error` with a JSON note. A bad row never stops the batch.

use crate::{FillError, FillOutcome, Orchestrator};
use serde::Serialize;
use serde_json::{json, Value};
use sheetplan_core::{AuditEvent, Job, SharedAudit, WriteEntry};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_QUEUE_RANGE: &str = "Queue!A2:F";

const COL_JOB_ID: usize = 0;
const COL_STATUS: usize = 1;
const COL_TEMPLATE_ID: usize = 2;
const COL_SPREADSHEET_ID: usize = 3;
const COL_PAYLOAD: usize = 4;
const COL_RESULT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Top-left corner of the control range: sheet part, first column
/// (0-based) and first row (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueAnchor {
    sheet: String,
    column: usize,
    row: usize,
}

impl QueueAnchor {
    pub fn parse(range: &str) -> Result<Self, FillError> {
        let invalid = || FillError::Config(format!("queue range '{}' is not A1 notation", range));
        let (sheet, cells) = range.rsplit_once('!').ok_or_else(invalid)?;
        let first = cells.split(':').next().unwrap_or_default().replace('$', "");
        let split = first
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = first.split_at(split);
        if sheet.is_empty() || letters.is_empty() {
            return Err(invalid());
        }
        let column = column_index(letters).ok_or_else(invalid)?;
        let row = digits.parse::<usize>().ok().filter(|r| *r > 0).ok_or_else(invalid)?;
        Ok(Self {
            sheet: sheet.to_string(),
            column,
            row,
        })
    }

    /// A1 address of a cell at `offset` rows below the anchor, in column
    /// `col` of the control layout.
    pub fn cell(&self, offset: usize, col: usize) -> String {
        format!(
            "{}!{}{}",
            self.sheet,
            column_name(self.column + col),
            self.row + offset
        )
    }
}

/// Columns past `ZZZ` do not exist in a sheet.
const MAX_COLUMNS: usize = 18_278;

fn column_index(letters: &str) -> Option<usize> {
    let mut index = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    index.checked_sub(1).filter(|i| *i < MAX_COLUMNS)
}

fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.iter().rev().collect()
}

/// Cell text; numbers are printed the way the sheet shows them.
fn cell_text(row: &[Value], col: usize) -> String {
    match row.get(col) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn parse_row(row: &[Value]) -> Result<Job, String> {
    let required = |col: usize, name: &str| {
        let text = cell_text(row, col);
        if text.is_empty() {
            Err(format!("missing {}", name))
        } else {
            Ok(text)
        }
    };
    let job_id = required(COL_JOB_ID, "job_id")?;
    let template_id = required(COL_TEMPLATE_ID, "template_id")?;
    let spreadsheet_id = required(COL_SPREADSHEET_ID, "spreadsheet_id")?;

    let raw_payload = cell_text(row, COL_PAYLOAD);
    let payload = if raw_payload.is_empty() {
        json!({})
    } else {
        serde_json::from_str(&raw_payload).map_err(|e| format!("payload_json is not JSON: {}", e))?
    };

    Ok(Job {
        job_id,
        template_id,
        spreadsheet_id,
        payload,
        dry_run: false,
    })
}

fn success_note(outcome: &FillOutcome) -> Value {
    json!({
        "status": outcome.status,
        "applied": outcome.applied,
        "writes_count": outcome.writes_count,
        "total_updated_cells": outcome.total_updated_cells,
        "notes": outcome.notes,
    })
}

fn error_note(kind: &str, errors: Vec<String>) -> Value {
    json!({"status": "ERROR", "kind": kind, "errors": errors})
}

pub struct QueueProcessor {
    orchestrator: Arc<Orchestrator>,
    spreadsheet_id: String,
    range: String,
    audit: SharedAudit,
}

impl QueueProcessor {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        spreadsheet_id: impl Into<String>,
        audit: SharedAudit,
    ) -> Self {
        Self {
            orchestrator,
            spreadsheet_id: spreadsheet_id.into(),
            range: DEFAULT_QUEUE_RANGE.to_string(),
            audit,
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Process up to `limit` pending rows. Only a failure to read the
    /// control sheet is an error; per-row failures are counted.
    pub async fn process(&self, limit: usize) -> Result<QueueSummary, FillError> {
        let start = Instant::now();
        let anchor = QueueAnchor::parse(&self.range)?;
        let sheets = self.orchestrator.sheets();

        // Statuses change under us between runs; never trust a cached read.
        sheets.invalidate(&self.spreadsheet_id);
        let ranges = vec![self.range.clone()];
        let rows = sheets
            .batch_get(&self.spreadsheet_id, &ranges)
            .await?
            .into_iter()
            .next()
            .map(|r| r.values)
            .unwrap_or_default();

        let pending: Vec<(usize, Vec<Value>)> = rows
            .into_iter()
            .enumerate()
            .filter(|(_, row)| cell_text(row, COL_STATUS).eq_ignore_ascii_case("pending"))
            .take(limit)
            .collect();

        let mut summary = QueueSummary::default();
        for (offset, row) in pending {
            summary.processed += 1;
            if self.process_row(&anchor, offset, &row).await {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }

        tracing::info!(
            spreadsheet_id = %self.spreadsheet_id,
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "queue batch finished"
        );
        self.audit.emit(
            AuditEvent::new("queue.processed")
                .with_spreadsheet(&self.spreadsheet_id)
                .with_data("limit", limit)
                .with_data("processed", summary.processed)
                .with_data("succeeded", summary.succeeded)
                .with_data("failed", summary.failed)
                .since(start),
        );
        Ok(summary)
    }

    async fn process_row(&self, anchor: &QueueAnchor, offset: usize, row: &[Value]) -> bool {
        let status_cell = anchor.cell(offset, COL_STATUS);
        let result_cell = anchor.cell(offset, COL_RESULT);

        if let Err(err) = self.write_cells(vec![WriteEntry::single(&status_cell, "running")]).await {
            tracing::error!(cell = %status_cell, error = %err, "could not claim queue row");
            return false;
        }

        let (status, note, ok) = match parse_row(row) {
            Err(problem) => (
                "error",
                error_note("VALIDATION", vec![format!("QUEUE/{}", problem)]),
                false,
            ),
            Ok(job) => match self.orchestrator.fill(&job).await {
                Ok(outcome) => ("done", success_note(&outcome), true),
                Err(err) => ("error", error_note(err.kind().code(), err.errors()), false),
            },
        };

        let writes = vec![
            WriteEntry::single(&status_cell, status),
            WriteEntry::single(&result_cell, note.to_string()),
        ];
        if let Err(err) = self.write_cells(writes).await {
            tracing::error!(cell = %status_cell, error = %err, "could not record queue row outcome");
            return false;
        }
        ok
    }

    async fn write_cells(&self, writes: Vec<WriteEntry>) -> Result<u64, FillError> {
        Ok(self
            .orchestrator
            .sheets()
            .batch_update(&self.spreadsheet_id, &writes)
            .await?)
    }
}
