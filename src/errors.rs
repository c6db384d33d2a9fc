/*!
 * Error types for the content-translate library.
 *
 * This module contains custom error types for the different seams of the
 * application, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

use crate::jobs::models::JobStatus;

/// Errors that can occur when working with translation providers
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider returned a different number of texts than it was sent
    #[error("Provider returned {actual} texts, expected {expected}")]
    ResultMismatch {
        /// Number of texts sent
        expected: usize,
        /// Number of texts received
        actual: usize,
    },

    /// Every attempt of a retried call failed
    #[error("Provider call failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error of the final attempt
        last_error: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Whether retrying the same call can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AuthenticationError(_) | Self::ResultMismatch { .. } => false,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::RetriesExhausted { .. } => false,
            _ => true,
        }
    }
}

/// Errors that can occur while translating a single record
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// Error from the provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Shortening never produced a text within the requested bound
    #[error("Could not shorten text to {max_length} characters after {attempts} attempts (best: {best_length})")]
    LengthExceeded {
        /// Requested upper bound in characters
        max_length: usize,
        /// Number of shorten attempts made
        attempts: u32,
        /// Length of the shortest candidate seen
        best_length: usize,
    },

    /// A field path could not be read or written
    #[error("Record error: {0}")]
    Record(String),
}

/// Errors returned by the batch job control surface
#[derive(Error, Debug)]
pub enum JobError {
    /// Malformed job parameters
    #[error("Invalid job parameters: {0}")]
    Validation(String),

    /// An active job already exists for the same key
    #[error("A job is already active for {content_type} ({target_locale}): {job_id}")]
    Conflict {
        /// Content type of the conflicting job
        content_type: String,
        /// Target locale of the conflicting job
        target_locale: String,
        /// Identifier of the active job
        job_id: String,
    },

    /// The requested transition is not allowed from the current status
    #[error("Cannot {operation} job {job_id} while it is {status}")]
    InvalidState {
        /// Job identifier
        job_id: String,
        /// Current status of the job
        status: JobStatus,
        /// Requested operation
        operation: &'static str,
    },

    /// No job exists with the given identifier
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job store or content store failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for JobError {
    fn from(error: anyhow::Error) -> Self {
        Self::Storage(format!("{:#}", error))
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from job control
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
