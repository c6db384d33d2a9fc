/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all job persistence,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::{Context, Result};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};

use super::connection::DatabaseConnection;
use super::models::{FailureRecord, JobRecord, JobStatus, timestamp};

const JOB_COLUMNS: &str = "id, content_type, source_locale, target_locale, fields_to_translate, priority, status, \
     processed, failed, total, cursor, error, created_at, updated_at, completed_at";

/// Repository for database operations
#[derive(Clone, Debug)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

/// Progress made by one processed slice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceProgress {
    /// Records translated and saved
    pub processed: i64,
    /// Records that exhausted their attempts
    pub failed: Vec<FailureRecord>,
    /// Highest record id of the slice
    pub cursor: Option<i64>,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn parse_job_row(row: &rusqlite::Row) -> rusqlite::Result<JobRecord> {
        let fields: String = row.get(4)?;
        let status: String = row.get(6)?;
        Ok(JobRecord {
            id: row.get(0)?,
            content_type: row.get(1)?,
            source_locale: row.get(2)?,
            target_locale: row.get(3)?,
            fields_to_translate: serde_json::from_str(&fields).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
            })?,
            priority: row.get(5)?,
            status: status.parse().map_err(|e: anyhow::Error| {
                rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, e.into())
            })?,
            processed: row.get(7)?,
            failed: row.get(8)?,
            total: row.get(9)?,
            cursor: row.get(10)?,
            error: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
            completed_at: row.get(14)?,
        })
    }

    fn get_job_sync(conn: &Connection, job_id: &str) -> Result<Option<JobRecord>> {
        let sql = format!("SELECT {} FROM batch_translate_jobs WHERE id = ?1", JOB_COLUMNS);
        let job = conn.query_row(&sql, [job_id], Self::parse_job_row).optional()?;
        Ok(job)
    }

    fn query_jobs(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<JobRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let jobs = stmt
            .query_map(params, Self::parse_job_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    // =========================================================================
    // Job Operations
    // =========================================================================

    /// Insert a new job
    ///
    /// Fails when another active job holds the same content type and target
    /// locale.
    pub async fn create_job(&self, job: &JobRecord) -> Result<()> {
        let job = job.clone();
        let fields = serde_json::to_string(&job.fields_to_translate)?;

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO batch_translate_jobs (
                        id, content_type, source_locale, target_locale, fields_to_translate, priority, status,
                        processed, failed, total, cursor, error, created_at, updated_at, completed_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                    "#,
                    params![
                        job.id,
                        job.content_type,
                        job.source_locale,
                        job.target_locale,
                        fields,
                        job.priority,
                        job.status.to_string(),
                        job.processed,
                        job.failed,
                        job.total,
                        job.cursor,
                        job.error,
                        job.created_at,
                        job.updated_at,
                        job.completed_at,
                    ],
                )
                .with_context(|| format!("Failed to insert job {}", job.id))?;
                Ok(())
            })
            .await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| Self::get_job_sync(conn, &job_id))
            .await
    }

    /// Find the active job for a content type and target locale
    pub async fn find_active_job(&self, content_type: &str, target_locale: &str) -> Result<Option<JobRecord>> {
        let content_type = content_type.to_string();
        let target_locale = target_locale.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM batch_translate_jobs
                     WHERE content_type = ?1 AND target_locale = ?2
                       AND status IN ('created', 'running', 'paused')
                     LIMIT 1",
                    JOB_COLUMNS
                );
                let job = conn
                    .query_row(&sql, params![content_type, target_locale], Self::parse_job_row)
                    .optional()?;
                Ok(job)
            })
            .await
    }

    /// List jobs, most recently updated first
    pub async fn list_jobs(&self, content_type: Option<&str>) -> Result<Vec<JobRecord>> {
        let content_type = content_type.map(str::to_string);

        self.db
            .execute_async(move |conn| match content_type {
                Some(ct) => {
                    let sql = format!(
                        "SELECT {} FROM batch_translate_jobs WHERE content_type = ?1
                         ORDER BY updated_at DESC, rowid DESC",
                        JOB_COLUMNS
                    );
                    Self::query_jobs(conn, &sql, &[&ct])
                }
                None => {
                    let sql = format!(
                        "SELECT {} FROM batch_translate_jobs ORDER BY updated_at DESC, rowid DESC",
                        JOB_COLUMNS
                    );
                    Self::query_jobs(conn, &sql, &[])
                }
            })
            .await
    }

    /// List jobs in any of the given statuses, oldest first
    pub async fn list_jobs_by_status(&self, statuses: &[JobStatus]) -> Result<Vec<JobRecord>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();

        self.db
            .execute_async(move |conn| {
                let placeholders = (1..=statuses.len())
                    .map(|i| format!("?{}", i))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "SELECT {} FROM batch_translate_jobs WHERE status IN ({}) ORDER BY created_at ASC",
                    JOB_COLUMNS, placeholders
                );
                let params: Vec<&dyn rusqlite::ToSql> =
                    statuses.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
                Self::query_jobs(conn, &sql, &params)
            })
            .await
    }

    /// Update job status
    ///
    /// Moves not allowed by the job state machine are rejected. Terminal
    /// statuses also stamp `completed_at`. `error` is only overwritten when
    /// given.
    pub async fn update_status(&self, job_id: &str, status: JobStatus, error: Option<String>) -> Result<()> {
        let job_id = job_id.to_string();
        let now = timestamp();

        self.db
            .transaction_async(move |tx| {
                let current = Self::get_job_sync(tx, &job_id)?
                    .ok_or_else(|| anyhow::anyhow!("Job {} not found", job_id))?
                    .status;
                if !current.can_transition_to(status) {
                    return Err(anyhow::anyhow!(
                        "Job {} cannot move from {} to {}",
                        job_id,
                        current,
                        status
                    ));
                }

                let completed_at = status.is_terminal().then(|| now.clone());
                tx.execute(
                    r#"
                    UPDATE batch_translate_jobs
                    SET status = ?1, updated_at = ?2, completed_at = COALESCE(?3, completed_at),
                        error = COALESCE(?4, error)
                    WHERE id = ?5
                    "#,
                    params![status.to_string(), now, completed_at, error, job_id],
                )?;
                debug!("Job {} status set to {} (was {})", job_id, status, current);
                Ok(())
            })
            .await
    }

    /// Persist the outcome of a slice in one transaction
    ///
    /// Counters are incremented, the cursor moved and failures recorded.
    /// `total` is raised if needed so that `processed + failed <= total`.
    pub async fn record_slice(&self, job_id: &str, progress: SliceProgress) -> Result<JobRecord> {
        let job_id = job_id.to_string();
        let now = timestamp();

        self.db
            .transaction_async(move |tx| {
                let failed = progress.failed.len() as i64;
                tx.execute(
                    r#"
                    UPDATE batch_translate_jobs
                    SET processed = processed + ?1,
                        failed = failed + ?2,
                        total = MAX(total, processed + failed + ?1 + ?2),
                        cursor = COALESCE(?3, cursor),
                        updated_at = ?4
                    WHERE id = ?5
                    "#,
                    params![progress.processed, failed, progress.cursor, now, job_id],
                )?;

                for failure in &progress.failed {
                    tx.execute(
                        r#"
                        INSERT INTO batch_translate_failures (job_id, record_id, attempts, error, created_at)
                        VALUES (?1, ?2, ?3, ?4, ?5)
                        "#,
                        params![
                            failure.job_id,
                            failure.record_id,
                            failure.attempts,
                            failure.error,
                            failure.created_at,
                        ],
                    )?;
                }

                Self::get_job_sync(tx, &job_id)?.ok_or_else(|| anyhow::anyhow!("Job {} not found", job_id))
            })
            .await
    }

    /// Failures recorded for a job, in record order
    pub async fn list_failures(&self, job_id: &str) -> Result<Vec<FailureRecord>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT job_id, record_id, attempts, error, created_at
                    FROM batch_translate_failures
                    WHERE job_id = ?1
                    ORDER BY record_id ASC
                    "#,
                )?;
                let failures = stmt
                    .query_map([job_id], |row| {
                        Ok(FailureRecord {
                            job_id: row.get(0)?,
                            record_id: row.get(1)?,
                            attempts: row.get(2)?,
                            error: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(failures)
            })
            .await
    }
}
