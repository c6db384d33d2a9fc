/*!
 * Batch job manager for translation job lifecycle.
 *
 * This module handles:
 * - Submitting jobs under the single-flight rule
 * - Pausing, resuming and cancelling jobs
 * - Recovering jobs interrupted by a restart
 * - Draining running jobs on shutdown
 *
 * Each running job is driven by a [`JobRunner`] task that owns the job's
 * progress between slices. The control lock covers state checks and
 * signalling only; waiting for a task to park happens outside it, so a slow
 * slice on one key never blocks operations on another.
 */

use log::{error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::app_config::BatchConfig;
use crate::content::ContentStore;
use crate::database::models::JobRecord;
use crate::database::repository::Repository;
use crate::errors::JobError;
use crate::language_utils::validate_locale_code;
use crate::translation::RecordTranslator;

use super::models::{BatchJob, JobStatus, SubmitJobParams};
use super::scheduler::{JobRunner, JobSignal};

/// Task of a job, kept until the task reports done
struct JobHandle {
    signal: watch::Sender<JobSignal>,
    done: watch::Receiver<bool>,
}

impl JobHandle {
    /// The task neither reported done nor went away
    fn is_live(&self) -> bool {
        !*self.done.borrow() && self.done.has_changed().is_ok()
    }
}

struct Inner {
    repo: Repository,
    store: Arc<dyn ContentStore>,
    translator: RecordTranslator,
    config: BatchConfig,
    /// Serializes submit and lifecycle operations
    control: tokio::sync::Mutex<()>,
    handles: Mutex<HashMap<String, JobHandle>>,
}

/// Manager for batch translation jobs
#[derive(Clone)]
pub struct BatchJobManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BatchJobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchJobManager")
            .field("config", &self.inner.config)
            .field("running", &self.inner.handles.lock().len())
            .finish()
    }
}

fn short(id: &str) -> &str {
    &id[..8.min(id.len())]
}

impl BatchJobManager {
    /// Create a new manager
    pub fn new(
        repo: Repository,
        store: Arc<dyn ContentStore>,
        translator: RecordTranslator,
        config: BatchConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                repo,
                store,
                translator,
                config,
                control: tokio::sync::Mutex::new(()),
                handles: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Get the underlying repository
    pub fn repository(&self) -> &Repository {
        &self.inner.repo
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit a job and start running it
    pub async fn submit_job(&self, params: SubmitJobParams) -> Result<String, JobError> {
        self.validate(&params).await?;

        let _guard = self.inner.control.lock().await;

        if let Some(active) = self
            .inner
            .repo
            .find_active_job(&params.content_type, &params.target_locale)
            .await?
        {
            return Err(Self::conflict(active));
        }

        let total = self
            .inner
            .store
            .count_untranslated(&params.content_type, &params.source_locale, &params.target_locale)
            .await?;

        let mut job = JobRecord::new(
            params.content_type,
            params.source_locale,
            params.target_locale,
            params.fields_to_translate,
            params.priority,
        );
        job.total = total as i64;

        if let Err(e) = self.inner.repo.create_job(&job).await {
            // lost a race against another process sharing the database
            if let Some(active) = self
                .inner
                .repo
                .find_active_job(&job.content_type, &job.target_locale)
                .await?
            {
                return Err(Self::conflict(active));
            }
            return Err(e.into());
        }

        info!(
            "Created job {} for {} ({} -> {}, {} records)",
            job.short_id(),
            job.content_type,
            job.source_locale,
            job.target_locale,
            job.total
        );

        self.inner.repo.update_status(&job.id, JobStatus::Running, None).await?;
        self.spawn(&job.id);

        Ok(job.id)
    }

    async fn validate(&self, params: &SubmitJobParams) -> Result<(), JobError> {
        if params.fields_to_translate.is_empty() {
            return Err(JobError::Validation("No fields to translate".to_string()));
        }
        for field in &params.fields_to_translate {
            field
                .path()
                .map_err(|e| JobError::Validation(format!("Invalid field '{}': {}", field.field, e)))?;
        }
        for locale in [&params.source_locale, &params.target_locale] {
            validate_locale_code(locale).map_err(|e| JobError::Validation(e.to_string()))?;
        }
        if !self.inner.store.has_content_type(&params.content_type).await? {
            return Err(JobError::Validation(format!(
                "Unknown content type: {}",
                params.content_type
            )));
        }
        Ok(())
    }

    fn conflict(active: JobRecord) -> JobError {
        JobError::Conflict {
            content_type: active.content_type,
            target_locale: active.target_locale,
            job_id: active.id,
        }
    }

    fn invalid_state(job: &JobRecord, operation: &'static str) -> JobError {
        JobError::InvalidState {
            job_id: job.id.clone(),
            status: job.status,
            operation,
        }
    }

    // =========================================================================
    // Lifecycle Control
    // =========================================================================

    /// Pause a running job at its next slice boundary
    ///
    /// Returns once the job is parked.
    pub async fn pause_job(&self, job_id: &str) -> Result<(), JobError> {
        let stopping = {
            let _guard = self.inner.control.lock().await;

            let job = self.load(job_id).await?;
            if job.status != JobStatus::Running {
                return Err(Self::invalid_state(&job, "pause"));
            }

            let stopping = self.signal(job_id, JobSignal::Pause);
            if stopping.is_none() {
                // running in storage with no live task, left over from a crash
                self.inner.repo.update_status(job_id, JobStatus::Paused, None).await?;
            }
            stopping
        };

        if let Some(done) = stopping {
            self.wait_done(job_id, done).await?;
        }

        let job = self.load(job_id).await?;
        if job.status != JobStatus::Paused {
            return Err(Self::invalid_state(&job, "pause"));
        }

        info!("Paused job {} at {}/{}", short(job_id), job.processed, job.total);
        Ok(())
    }

    /// Resume a paused job from its persisted cursor
    pub async fn resume_job(&self, job_id: &str) -> Result<(), JobError> {
        let _guard = self.inner.control.lock().await;

        let job = self.load(job_id).await?;
        if job.status != JobStatus::Paused {
            return Err(Self::invalid_state(&job, "resume"));
        }

        self.inner.repo.update_status(job_id, JobStatus::Running, None).await?;
        self.spawn(job_id);

        info!("Resumed job {} at {}/{}", short(job_id), job.processed, job.total);
        Ok(())
    }

    /// Cancel a job
    ///
    /// Cancelling an already cancelled job succeeds.
    pub async fn cancel_job(&self, job_id: &str) -> Result<(), JobError> {
        let stopping = {
            let _guard = self.inner.control.lock().await;

            let job = self.load(job_id).await?;
            match job.status {
                JobStatus::Cancelled => return Ok(()),
                JobStatus::Completed | JobStatus::Errored => {
                    return Err(Self::invalid_state(&job, "cancel"));
                }
                JobStatus::Running => {
                    let stopping = self.signal(job_id, JobSignal::Cancel);
                    if stopping.is_none() {
                        self.inner.repo.update_status(job_id, JobStatus::Cancelled, None).await?;
                    }
                    stopping
                }
                JobStatus::Paused | JobStatus::Created => {
                    self.inner.repo.update_status(job_id, JobStatus::Cancelled, None).await?;
                    None
                }
            }
        };

        if let Some(done) = stopping {
            self.wait_done(job_id, done).await?;
        }

        let job = self.load(job_id).await?;
        if job.status != JobStatus::Cancelled {
            return Err(Self::invalid_state(&job, "cancel"));
        }

        info!("Cancelled job {} at {}/{}", short(job_id), job.processed, job.total);
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Get a job by ID
    pub async fn get_job(&self, job_id: &str) -> Result<BatchJob, JobError> {
        Ok(self.load(job_id).await?.into())
    }

    /// List jobs, most recently updated first
    pub async fn list_jobs(&self, content_type: Option<&str>) -> Result<Vec<BatchJob>, JobError> {
        let jobs = self.inner.repo.list_jobs(content_type).await?;
        Ok(jobs.into_iter().map(BatchJob::from).collect())
    }

    /// Wait until the job's task stops, then return the job
    ///
    /// Returns immediately for jobs without a live task.
    pub async fn wait_for_job(&self, job_id: &str) -> Result<BatchJob, JobError> {
        let done = self.inner.handles.lock().get(job_id).map(|h| h.done.clone());
        if let Some(done) = done {
            self.wait_done(job_id, done).await?;
        }
        self.get_job(job_id).await
    }

    async fn load(&self, job_id: &str) -> Result<JobRecord, JobError> {
        self.inner
            .repo
            .get_job(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    // =========================================================================
    // Process Lifecycle
    // =========================================================================

    /// Restart jobs left `created` or `running` by a previous process
    ///
    /// Returns the ids of the restarted jobs.
    pub async fn recover(&self) -> Result<Vec<String>, JobError> {
        let _guard = self.inner.control.lock().await;

        let jobs = self
            .inner
            .repo
            .list_jobs_by_status(&[JobStatus::Created, JobStatus::Running])
            .await?;

        let mut recovered = Vec::new();
        for job in jobs {
            if self.restart(&job).await? {
                recovered.push(job.id);
            }
        }

        Ok(recovered)
    }

    /// Restart a single job left `created` or `running` by a previous process
    ///
    /// Other interrupted jobs are left untouched. Returns `false` when the job
    /// already has a live task in this process.
    pub async fn recover_job(&self, job_id: &str) -> Result<bool, JobError> {
        let _guard = self.inner.control.lock().await;

        let job = self.load(job_id).await?;
        if !matches!(job.status, JobStatus::Created | JobStatus::Running) {
            return Err(Self::invalid_state(&job, "recover"));
        }
        self.restart(&job).await
    }

    async fn restart(&self, job: &JobRecord) -> Result<bool, JobError> {
        if self.is_live(&job.id) {
            return Ok(false);
        }
        if job.status == JobStatus::Created {
            self.inner.repo.update_status(&job.id, JobStatus::Running, None).await?;
        }
        info!(
            "Recovering job {} for {} at {}/{}",
            job.short_id(),
            job.content_type,
            job.processed,
            job.total
        );
        self.spawn(&job.id);
        Ok(true)
    }

    /// Pause every running job and wait for their tasks to stop
    pub async fn shutdown(&self) -> Result<(), JobError> {
        let stopping: Vec<(String, watch::Receiver<bool>)> = {
            let _guard = self.inner.control.lock().await;
            let handles = self.inner.handles.lock();
            handles
                .iter()
                .filter(|(_, h)| h.is_live())
                .map(|(id, h)| {
                    h.signal.send_replace(JobSignal::Pause);
                    (id.clone(), h.done.clone())
                })
                .collect()
        };
        if stopping.is_empty() {
            return Ok(());
        }

        info!("Shutting down, pausing {} jobs", stopping.len());
        for (job_id, done) in stopping {
            self.wait_done(&job_id, done).await?;
        }

        Ok(())
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    fn spawn(&self, job_id: &str) {
        let (signal_tx, signal_rx) = watch::channel(JobSignal::Run);
        let (done_tx, done_rx) = watch::channel(false);

        let runner = JobRunner::new(
            job_id.to_string(),
            self.inner.repo.clone(),
            self.inner.store.clone(),
            self.inner.translator.clone(),
            self.inner.config.clone(),
            signal_rx,
            done_tx,
        );

        let mut handles = self.inner.handles.lock();
        handles.retain(|_, h| h.is_live());
        handles.insert(
            job_id.to_string(),
            JobHandle {
                signal: signal_tx,
                done: done_rx,
            },
        );
        drop(handles);

        tokio::spawn(runner.run());
    }

    fn is_live(&self, job_id: &str) -> bool {
        self.inner.handles.lock().get(job_id).is_some_and(JobHandle::is_live)
    }

    /// Send `signal` to the job's live task and return its done flag
    fn signal(&self, job_id: &str, signal: JobSignal) -> Option<watch::Receiver<bool>> {
        let handles = self.inner.handles.lock();
        let handle = handles.get(job_id).filter(|h| h.is_live())?;
        handle.signal.send_replace(signal);
        Some(handle.done.clone())
    }

    /// Wait for a job task to stop
    ///
    /// A task that stopped without reporting (a panic) leaves the job
    /// `errored`.
    async fn wait_done(&self, job_id: &str, mut done: watch::Receiver<bool>) -> Result<(), JobError> {
        let finished = done.wait_for(|d| *d).await.is_ok();
        self.inner.handles.lock().retain(|_, h| h.is_live());
        if finished {
            return Ok(());
        }

        error!("Job {} scheduler stopped unexpectedly", short(job_id));
        let job = self.load(job_id).await?;
        if job.status == JobStatus::Running {
            self.inner
                .repo
                .update_status(job_id, JobStatus::Errored, Some("Scheduler stopped unexpectedly".to_string()))
                .await?;
        } else {
            warn!("Job {} already {}", short(job_id), job.status);
        }
        Ok(())
    }
}
