/*!
 * Per-job scheduler loop.
 *
 * A runner pulls slices of untranslated records after the persisted cursor,
 * translates them with bounded concurrency and persists the slice outcome
 * before looking at its control signal again. Pause and cancel therefore
 * only take effect between slices.
 */

use anyhow::{Result, anyhow};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::app_config::BatchConfig;
use crate::content::{ContentStore, SourceRecord};
use crate::database::models::{FailureRecord, JobRecord, JobStatus};
use crate::database::repository::{Repository, SliceProgress};
use crate::translation::{RecordTranslator, TranslateParams};

/// Control signal observed by a runner between slices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSignal {
    Run,
    Pause,
    Cancel,
}

/// Outcome of one record after all its attempts
enum RecordOutcome {
    Saved,
    Failed(FailureRecord),
}

/// Drives one job until it parks or reaches a terminal status
pub struct JobRunner {
    job_id: String,
    repo: Repository,
    store: Arc<dyn ContentStore>,
    translator: RecordTranslator,
    config: BatchConfig,
    signal: watch::Receiver<JobSignal>,
    done: watch::Sender<bool>,
}

impl JobRunner {
    pub fn new(
        job_id: String,
        repo: Repository,
        store: Arc<dyn ContentStore>,
        translator: RecordTranslator,
        config: BatchConfig,
        signal: watch::Receiver<JobSignal>,
        done: watch::Sender<bool>,
    ) -> Self {
        Self {
            job_id,
            repo,
            store,
            translator,
            config,
            signal,
            done,
        }
    }

    /// Run the job, persisting its final status
    pub async fn run(self) {
        let short_id = &self.job_id[..8.min(self.job_id.len())];

        match self.drive().await {
            Ok(status) => info!("Job {} is {}", short_id, status),
            Err(e) => {
                error!("Job {} errored: {:#}", short_id, e);
                let message = format!("{:#}", e);
                if let Err(e) = self.repo.update_status(&self.job_id, JobStatus::Errored, Some(message)).await {
                    error!("Failed to mark job {} as errored: {:#}", short_id, e);
                }
            }
        }

        self.done.send_replace(true);
    }

    async fn drive(&self) -> Result<JobStatus> {
        let mut job = self
            .repo
            .get_job(&self.job_id)
            .await?
            .ok_or_else(|| anyhow!("Job {} not found", self.job_id))?;

        let params = TranslateParams {
            source_locale: job.source_locale.clone(),
            target_locale: job.target_locale.clone(),
            fields_to_translate: job.fields_to_translate.clone(),
            priority: job.priority,
        };

        info!(
            "Running job {} for {} ({} -> {}) from cursor {:?}",
            job.short_id(),
            job.content_type,
            job.source_locale,
            job.target_locale,
            job.cursor
        );

        loop {
            let signal = *self.signal.borrow();
            match signal {
                JobSignal::Pause => return self.finish(JobStatus::Paused).await,
                JobSignal::Cancel => return self.finish(JobStatus::Cancelled).await,
                JobSignal::Run => {}
            }

            let slice = self
                .store
                .untranslated_slice(
                    &job.content_type,
                    &job.source_locale,
                    &job.target_locale,
                    job.cursor,
                    self.config.slice_size.max(1),
                )
                .await?;

            if slice.is_empty() {
                return self.finish(JobStatus::Completed).await;
            }

            let progress = self.process_slice(&job, &params, slice).await?;
            job = self.repo.record_slice(&self.job_id, progress).await?;

            debug!(
                "Job {}: {}/{} processed, {} failed ({:.1}%)",
                job.short_id(),
                job.processed,
                job.total,
                job.failed,
                job.completion_percentage()
            );
        }
    }

    async fn finish(&self, status: JobStatus) -> Result<JobStatus> {
        self.repo.update_status(&self.job_id, status, None).await?;
        Ok(status)
    }

    async fn process_slice(
        &self,
        job: &JobRecord,
        params: &TranslateParams,
        slice: Vec<SourceRecord>,
    ) -> Result<SliceProgress> {
        let cursor = slice.iter().map(|r| r.id).max();

        let outcomes = stream::iter(slice)
            .map(|record| self.translate_record(job, params, record))
            .buffer_unordered(self.config.max_concurrent_records.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut progress = SliceProgress {
            cursor,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome? {
                RecordOutcome::Saved => progress.processed += 1,
                RecordOutcome::Failed(failure) => progress.failed.push(failure),
            }
        }

        Ok(progress)
    }

    /// Translate and save one record, retrying failed translations
    ///
    /// Translation failures are counted; a failing save is a storage error
    /// and fails the job.
    async fn translate_record(
        &self,
        job: &JobRecord,
        params: &TranslateParams,
        record: SourceRecord,
    ) -> Result<RecordOutcome> {
        let attempts = self.config.record_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.translator.translate(&record.data, params).await {
                Ok(translated) => {
                    self.store
                        .save_translation(&job.content_type, record.id, &job.target_locale, translated)
                        .await?;
                    return Ok(RecordOutcome::Saved);
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "Job {}: record {} failed: {} - attempt {}/{}",
                        job.short_id(),
                        record.id,
                        e,
                        attempt,
                        attempts
                    );
                    tokio::time::sleep(Duration::from_millis(self.config.record_retry_delay_ms)).await;
                }
                Err(e) => {
                    error!(
                        "Job {}: record {} failed after {} attempts: {}",
                        job.short_id(),
                        record.id,
                        attempt,
                        e
                    );
                    return Ok(RecordOutcome::Failed(FailureRecord::new(
                        job.id.clone(),
                        record.id,
                        attempt,
                        e.to_string(),
                    )));
                }
            }
        }
    }
}
