/*!
 * Job-level models exposed to callers of the job manager.
 */

use serde::{Deserialize, Serialize};

use crate::database::models::JobRecord;
use crate::translation::TranslatableField;

pub use crate::database::models::JobStatus;

/// Parameters for submitting a batch job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobParams {
    /// Content type uid
    pub content_type: String,
    /// Source locale code
    pub source_locale: String,
    /// Target locale code
    pub target_locale: String,
    /// Fields to translate in every record
    pub fields_to_translate: Vec<TranslatableField>,
    /// Forwarded to the provider
    #[serde(default)]
    pub priority: i64,
}

impl SubmitJobParams {
    pub fn new(
        content_type: impl Into<String>,
        source_locale: impl Into<String>,
        target_locale: impl Into<String>,
        fields_to_translate: Vec<TranslatableField>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            source_locale: source_locale.into(),
            target_locale: target_locale.into(),
            fields_to_translate,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

/// Progress counters of a job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
}

/// A batch translation job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub id: String,
    pub content_type: String,
    pub source_locale: String,
    pub target_locale: String,
    pub fields_to_translate: Vec<TranslatableField>,
    pub priority: i64,
    pub status: JobStatus,
    pub progress: JobProgress,
    /// Why the job errored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<JobRecord> for BatchJob {
    fn from(record: JobRecord) -> Self {
        Self {
            progress: JobProgress {
                processed: record.processed.max(0) as u64,
                failed: record.failed.max(0) as u64,
                total: record.total.max(0) as u64,
            },
            id: record.id,
            content_type: record.content_type,
            source_locale: record.source_locale,
            target_locale: record.target_locale,
            fields_to_translate: record.fields_to_translate,
            priority: record.priority,
            status: record.status,
            error: record.error,
            created_at: record.created_at,
            updated_at: record.updated_at,
            completed_at: record.completed_at,
        }
    }
}
