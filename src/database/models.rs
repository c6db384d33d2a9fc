/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::translation::TranslatableField;

/// Batch job status
///
/// `created -> running <-> paused`, then `completed`, `cancelled` or
/// `errored`, which are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Persisted, not yet scheduled
    Created,
    /// The scheduler is working through slices
    Running,
    /// Parked at a slice boundary, resumable
    Paused,
    /// Every untranslated record was processed
    Completed,
    /// Stopped on request
    Cancelled,
    /// Stopped by a storage or scheduler failure
    Errored,
}

impl JobStatus {
    /// Statuses that hold the single-flight slot of their key
    pub const ACTIVE: [JobStatus; 3] = [JobStatus::Created, JobStatus::Running, JobStatus::Paused];

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled | JobStatus::Errored)
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    /// Whether the state machine allows moving to `next`
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Created, Cancelled)
                | (Created, Errored)
                | (Running, Paused)
                | (Running, Completed)
                | (Running, Cancelled)
                | (Running, Errored)
                | (Paused, Running)
                | (Paused, Cancelled)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Created => write!(f, "created"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Paused => write!(f, "paused"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
            JobStatus::Errored => write!(f, "errored"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(JobStatus::Created),
            "running" => Ok(JobStatus::Running),
            "paused" => Ok(JobStatus::Paused),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            "errored" => Ok(JobStatus::Errored),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Current time as a sortable RFC 3339 timestamp
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Batch translation job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier (UUID)
    pub id: String,
    /// Content type uid
    pub content_type: String,
    /// Source locale code
    pub source_locale: String,
    /// Target locale code
    pub target_locale: String,
    /// Fields translated in every record
    pub fields_to_translate: Vec<TranslatableField>,
    /// Forwarded to the provider
    pub priority: i64,
    /// Current status
    pub status: JobStatus,
    /// Records translated and saved
    pub processed: i64,
    /// Records that failed every attempt
    pub failed: i64,
    /// Records to process
    pub total: i64,
    /// Id of the last record processed, resume point
    pub cursor: Option<i64>,
    /// Error that moved the job to `errored`
    pub error: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
    /// Timestamp of reaching a terminal status
    pub completed_at: Option<String>,
}

impl JobRecord {
    /// Create a new job record in `created` status
    pub fn new(
        content_type: String,
        source_locale: String,
        target_locale: String,
        fields_to_translate: Vec<TranslatableField>,
        priority: i64,
    ) -> Self {
        let now = timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content_type,
            source_locale,
            target_locale,
            fields_to_translate,
            priority,
            status: JobStatus::Created,
            processed: 0,
            failed: 0,
            total: 0,
            cursor: None,
            error: None,
            created_at: now.clone(),
            updated_at: now,
            completed_at: None,
        }
    }

    /// Short id for log lines
    pub fn short_id(&self) -> &str {
        &self.id[..8.min(self.id.len())]
    }

    /// Calculate completion percentage
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        ((self.processed + self.failed) as f64 / self.total as f64) * 100.0
    }
}

/// A record counted in a job's `failed` progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Job the failure belongs to
    pub job_id: String,
    /// Content record id
    pub record_id: i64,
    /// Attempts made before giving up
    pub attempts: u32,
    /// Last error message
    pub error: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl FailureRecord {
    pub fn new(job_id: String, record_id: i64, attempts: u32, error: String) -> Self {
        Self {
            job_id,
            record_id,
            attempts,
            error,
            created_at: timestamp(),
        }
    }
}
