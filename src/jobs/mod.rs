/*!
 * Batch job management.
 *
 * This module provides:
 * - Job submission with single-flight per content type and target locale
 * - Pause, resume and cancel at slice boundaries
 * - Durable progress so jobs resume after a restart
 */

pub mod manager;
pub mod models;
pub mod scheduler;

// Re-export main types
pub use manager::BatchJobManager;
pub use models::{BatchJob, JobProgress, JobStatus, SubmitJobParams};
