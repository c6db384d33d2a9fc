use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::content::{ContentStore, MemoryContentStore};
use crate::database::{DatabaseConnection, Repository};
use crate::errors::{AppError, JobError};
use crate::jobs::{BatchJob, BatchJobManager, JobStatus, SubmitJobParams};
use crate::providers::{TranslationProvider, build_provider};
use crate::report::{ProgressReporter, Report};
use crate::translation::RecordTranslator;

// @module: Application controller for batch translation runs

/// What a run should work on
#[derive(Debug, Clone)]
pub enum RunTarget {
    /// Submit a new job
    Submit(SubmitJobParams),
    /// Continue a paused or interrupted job
    Resume(String),
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    repo: Repository,
    provider: Arc<dyn TranslationProvider>,
    /// Interval between progress polls
    poll_interval: Duration,
}

impl Controller {
    // @method: Create a controller from configuration, opening the job database
    pub fn with_config(config: Config) -> Result<Self> {
        let db = DatabaseConnection::open(config.database_path.as_deref())?;
        let provider = build_provider(&config.provider)?;
        Ok(Self::with_parts(config, Repository::new(db), provider))
    }

    /// Create a controller from already built parts
    pub fn with_parts(config: Config, repo: Repository, provider: Arc<dyn TranslationProvider>) -> Self {
        Self {
            config,
            repo,
            provider,
            poll_interval: Duration::from_millis(200),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn manager(&self, store: Arc<dyn ContentStore>) -> BatchJobManager {
        BatchJobManager::new(
            self.repo.clone(),
            store,
            RecordTranslator::new(self.provider.clone()),
            self.config.batch.clone(),
        )
    }

    /// Run a job over a content export file and write the result back
    ///
    /// With `pause_after`, the job is paused once that many records are
    /// processed. Ctrl-C pauses every running job before exiting.
    pub async fn run(
        &self,
        content_file: &Path,
        target: RunTarget,
        pause_after: Option<u64>,
    ) -> Result<BatchJob, AppError> {
        let store = Arc::new(MemoryContentStore::load(content_file)?);
        let manager = self.manager(store.clone());

        let job_id = match target {
            RunTarget::Submit(params) => manager.submit_job(params).await?,
            RunTarget::Resume(job_id) => {
                let job = manager.get_job(&job_id).await?;
                match job.status {
                    JobStatus::Paused => manager.resume_job(&job_id).await?,
                    JobStatus::Created | JobStatus::Running => {
                        manager.recover_job(&job_id).await?;
                    }
                    status => {
                        return Err(JobError::InvalidState {
                            job_id,
                            status,
                            operation: "resume",
                        }
                        .into());
                    }
                }
                job_id
            }
        };

        info!("Translating with {}, please wait…", self.provider.name());
        let job = self.track(&manager, &job_id, pause_after).await?;

        store
            .save(content_file)
            .with_context(|| format!("Failed to save translations to {}", content_file.display()))?;

        match job.status {
            JobStatus::Completed => info!(
                "Job {} completed: {} translated, {} failed",
                job.id, job.progress.processed, job.progress.failed
            ),
            JobStatus::Paused => info!(
                "Job {} paused at {}/{}, continue with --resume {}",
                job.id, job.progress.processed, job.progress.total, job.id
            ),
            status => warn!(
                "Job {} ended {}: {}",
                job.id,
                status,
                job.error.as_deref().unwrap_or("no error recorded")
            ),
        }

        if let Ok(usage) = self.provider.usage().await {
            info!("Provider usage: {}", usage);
        }

        Ok(job)
    }

    /// Poll the job until it stops running, mirroring progress in a bar
    async fn track(
        &self,
        manager: &BatchJobManager,
        job_id: &str,
        pause_after: Option<u64>,
    ) -> Result<BatchJob, JobError> {
        let job = manager.get_job(job_id).await?;
        let progress_bar = ProgressBar::new(job.progress.total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({percent}%) {msg} {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));

        let mut ticker = tokio::time::interval(self.poll_interval);
        let job = loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    progress_bar.set_message("pausing");
                    manager.shutdown().await?;
                }
            }

            let job = manager.get_job(job_id).await?;
            progress_bar.set_length(job.progress.total);
            progress_bar.set_position(job.progress.processed + job.progress.failed);
            if job.progress.failed > 0 {
                progress_bar.set_message(format!("{} failed", job.progress.failed));
            }

            if job.status != JobStatus::Running {
                break job;
            }

            if pause_after.is_some_and(|n| job.progress.processed >= n) {
                progress_bar.set_message("pausing");
                manager.pause_job(job_id).await?;
                break manager.get_job(job_id).await?;
            }
        };

        progress_bar.finish_and_clear();
        Ok(job)
    }

    /// Build the translation report for a content export
    pub async fn report(&self, content_file: &Path) -> Result<Report, AppError> {
        let store = Arc::new(MemoryContentStore::load(content_file)?);
        let reporter = ProgressReporter::new(
            self.repo.clone(),
            store,
            RecordTranslator::new(self.provider.clone()),
        );
        Ok(reporter.report().await?)
    }

    /// All jobs in the database, most recently updated first
    pub async fn jobs(&self) -> Result<Vec<BatchJob>, AppError> {
        let jobs = self.repo.list_jobs(None).await?;
        Ok(jobs.into_iter().map(BatchJob::from).collect())
    }

    /// Human readable table of jobs
    pub fn format_jobs(jobs: &[BatchJob]) -> String {
        let mut table = format!(
            "{:<36}  {:<28}  {:<11}  {:<10}  {:>15}\n",
            "ID", "CONTENT TYPE", "LOCALES", "STATUS", "PROGRESS"
        );
        for job in jobs {
            table.push_str(&format!(
                "{:<36}  {:<28}  {:<11}  {:<10}  {:>15}\n",
                job.id,
                job.content_type,
                format!("{}->{}", job.source_locale, job.target_locale),
                job.status.to_string(),
                format!("{}/{} ({} failed)", job.progress.processed, job.progress.total, job.progress.failed),
            ));
        }
        table
    }

    /// Summary line of the job database
    pub fn database_stats(&self) -> Result<String> {
        Ok(self.repo.connection().stats()?.to_string())
    }
}
