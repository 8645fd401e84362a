//! Data Model: Template, Job, WritePlan, JobRecord
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A spreadsheet layout a plan may be applied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Template ID (ex: "cotizacion_isodec_v2")
    pub template_id: String,
    /// Sheet the template lives on (ex: "EPS_100")
    pub sheet_name: String,
    /// Addresses a plan is allowed to write, in declaration order
    pub writes_allowlist: Vec<String>,
    /// Addresses snapshotted before planning
    #[serde(default)]
    pub read_ranges: Vec<String>,
    /// Logical field name → address (ex: "fecha" → "EPS_100!F3")
    #[serde(default)]
    pub hints: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One fill request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Idempotency key, supplied by the caller
    pub job_id: String,
    pub template_id: String,
    pub spreadsheet_id: String,
    /// Arbitrary caller data the planner turns into writes
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub dry_run: bool,
}

/// A rectangular block of literal values destined for one range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteEntry {
    pub range: String,
    pub values: Vec<Vec<Value>>,
}

impl WriteEntry {
    pub fn new(range: impl Into<String>, values: Vec<Vec<Value>>) -> Self {
        Self {
            range: range.into(),
            values,
        }
    }

    /// A 1x1 write.
    pub fn single(range: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(range, vec![vec![value.into()]])
    }

    pub fn cell_count(&self) -> usize {
        self.values.iter().map(Vec::len).sum()
    }

    /// Iterate every cell with its zero-based (row, column) position.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &Value)> {
        self.values
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, v)| (r, c, v)))
    }
}

/// Intermediate quantities the planner derived from the payload.
///
/// Kept as `f64` so a fractional quantity coming back from the planner is
/// caught by the BOM quantity check instead of a deserialization error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputedQuantities {
    pub panels_needed: f64,
    pub supports: f64,
    pub area_m2: f64,
    pub fixing_points: f64,
}

/// The planner's proposal for one job attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WritePlan {
    pub job_id: String,
    pub version: String,
    pub writes: Vec<WriteEntry>,
    pub computed: ComputedQuantities,
    pub notes: String,
}

impl WritePlan {
    pub fn total_cells(&self) -> usize {
        self.writes.iter().map(WriteEntry::cell_count).sum()
    }
}

/// Values read back from one range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub range: String,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "RUNNING",
            JobStatus::Done => "DONE",
            JobStatus::Error => "ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(JobStatus::Running),
            "DONE" => Some(JobStatus::Done),
            "ERROR" => Some(JobStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a DONE job needs to replay its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub total_updated_cells: u64,
    #[serde(default)]
    pub writes_count: usize,
    #[serde(default)]
    pub dry_run: bool,
}

impl JobResult {
    pub fn applied(total_updated_cells: u64, writes_count: usize) -> Self {
        Self {
            total_updated_cells,
            writes_count,
            dry_run: false,
        }
    }

    pub fn dry_run(writes_count: usize) -> Self {
        Self {
            total_updated_cells: 0,
            writes_count,
            dry_run: true,
        }
    }
}

/// Idempotency ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub payload_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn running(job_id: impl Into<String>, payload_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            status: JobStatus::Running,
            payload_hash: payload_hash.into(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The replayable view of this record, if it finished successfully.
    pub fn completed(&self) -> Option<CompletedJob> {
        match (self.status, &self.result) {
            (JobStatus::Done, Some(result)) => Some(CompletedJob {
                result: result.clone(),
                payload_hash: self.payload_hash.clone(),
            }),
            _ => None,
        }
    }
}

/// A DONE record as returned by the ledger's `get_done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedJob {
    pub result: JobResult,
    pub payload_hash: String,
}
