//! PostgreSQL ledger
//!
//! All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`) so the
//! crate builds without a database. `start` relies on the primary key plus
//! `ON CONFLICT DO NOTHING`; transitions are conditional updates on
//! `status = 'RUNNING'`.

use crate::{JobLedger, LedgerError, StartOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sheetplan_core::{CompletedJob, JobRecord, JobResult, JobStatus};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sheetplan_jobs (
    job_id        TEXT PRIMARY KEY,
    status        TEXT NOT NULL CHECK (status IN ('RUNNING', 'DONE', 'ERROR')),
    payload_hash  TEXT NOT NULL,
    result        JSONB,
    error         TEXT,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

#[derive(sqlx::FromRow)]
struct JobRow {
    job_id: String,
    status: String,
    payload_hash: String,
    result: Option<Json<JobResult>>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = LedgerError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::parse(&row.status).ok_or_else(|| LedgerError::Corrupt {
            job_id: row.job_id.clone(),
            detail: format!("unknown status '{}'", row.status),
        })?;
        Ok(JobRecord {
            job_id: row.job_id,
            status,
            payload_hash: row.payload_hash,
            result: row.result.map(|Json(r)| r),
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn backend(e: sqlx::Error) -> LedgerError {
    LedgerError::Backend(e.to_string())
}

pub struct PgJobLedger {
    pool: PgPool,
}

impl PgJobLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(backend)?;
        Ok(Self::new(pool))
    }

    /// Create the jobs table if it does not exist.
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl JobLedger for PgJobLedger {
    async fn get_done(&self, job_id: &str) -> Result<Option<CompletedJob>, LedgerError> {
        Ok(self.get(job_id).await?.and_then(|r| r.completed()))
    }

    async fn start(&self, job_id: &str, payload_hash: &str) -> Result<StartOutcome, LedgerError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO sheetplan_jobs (job_id, status, payload_hash)
            VALUES ($1, 'RUNNING', $2)
            ON CONFLICT (job_id) DO NOTHING
            "#,
        )
        .bind(job_id)
        .bind(payload_hash)
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .rows_affected();

        if inserted == 1 {
            return Ok(StartOutcome::Started);
        }
        match self.get(job_id).await? {
            Some(record) => Ok(StartOutcome::Existing(record)),
            None => Err(LedgerError::Corrupt {
                job_id: job_id.to_string(),
                detail: "insert conflicted but no row was found".to_string(),
            }),
        }
    }

    async fn done(&self, job_id: &str, result: &JobResult) -> Result<bool, LedgerError> {
        let updated = sqlx::query(
            r#"
            UPDATE sheetplan_jobs
            SET status = 'DONE', result = $2, updated_at = now()
            WHERE job_id = $1 AND status = 'RUNNING'
            "#,
        )
        .bind(job_id)
        .bind(Json(result))
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .rows_affected();
        Ok(updated == 1)
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<bool, LedgerError> {
        let updated = sqlx::query(
            r#"
            UPDATE sheetplan_jobs
            SET status = 'ERROR', error = $2, updated_at = now()
            WHERE job_id = $1 AND status = 'RUNNING'
            "#,
        )
        .bind(job_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .rows_affected();
        Ok(updated == 1)
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, LedgerError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT job_id, status, payload_hash, result, error, created_at, updated_at
            FROM sheetplan_jobs
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(JobRecord::try_from).transpose()
    }

    fn backend_name(&self) -> &str {
        "postgres"
    }
}
