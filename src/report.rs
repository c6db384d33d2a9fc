/*!
 * Translation progress reporting.
 *
 * Builds, for every localized content type, the record count and
 * completeness of each locale together with the most recent job targeting
 * that locale.
 */

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::content::{ContentStore, ContentTypeInfo, LocaleInfo};
use crate::database::repository::Repository;
use crate::errors::{JobError, TranslationError};
use crate::jobs::BatchJob;
use crate::translation::RecordTranslator;

/// Status of one locale of a content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleReport {
    /// Entries in this locale
    pub count: u64,
    /// Whether every entry exists in this locale
    pub complete: bool,
    /// Most recently updated job targeting this locale
    pub job: Option<BatchJob>,
}

/// Status of one content type across locales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeReport {
    pub content_type: String,
    /// Display name of the collection
    pub collection: String,
    pub locale_reports: BTreeMap<String, LocaleReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub content_types: Vec<ContentTypeReport>,
    pub locales: Vec<LocaleInfo>,
}

/// Aggregates job and content state for display
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    repo: Repository,
    store: Arc<dyn ContentStore>,
    translator: RecordTranslator,
}

impl ProgressReporter {
    pub fn new(repo: Repository, store: Arc<dyn ContentStore>, translator: RecordTranslator) -> Self {
        Self {
            repo,
            store,
            translator,
        }
    }

    /// Build the report for every localized content type
    pub async fn report(&self) -> Result<Report, JobError> {
        let locales = self.store.locales().await?;
        let content_types: Vec<ContentTypeInfo> = self
            .store
            .content_types()
            .await?
            .into_iter()
            .filter(|ct| ct.localized)
            .collect();

        let reports = try_join_all(
            content_types
                .iter()
                .map(|ct| self.content_type_report(ct, &locales)),
        )
        .await?;

        Ok(Report {
            content_types: reports,
            locales,
        })
    }

    async fn content_type_report(
        &self,
        content_type: &ContentTypeInfo,
        locales: &[LocaleInfo],
    ) -> Result<ContentTypeReport, JobError> {
        let jobs = self.repo.list_jobs(Some(&content_type.uid)).await?;

        let mut locale_reports = BTreeMap::new();
        for locale in locales {
            let count = self.store.count(&content_type.uid, &locale.code).await?;
            let complete = self
                .store
                .is_fully_translated(&content_type.uid, &locale.code)
                .await?;
            let job = jobs
                .iter()
                .find(|job| job.target_locale == locale.code)
                .cloned()
                .map(BatchJob::from);

            locale_reports.insert(locale.code.clone(), LocaleReport { count, complete, job });
        }

        Ok(ContentTypeReport {
            content_type: content_type.uid.clone(),
            collection: content_type.display_name.clone(),
            locale_reports,
        })
    }

    /// Cumulative provider usage, advisory only
    pub async fn usage(&self) -> Result<u64, TranslationError> {
        self.translator.usage().await
    }
}
