/*!
 * Retry wrapper for translation providers.
 *
 * A failed batch translate call is retried as a whole with exponential
 * backoff. When every attempt fails the caller gets
 * [`ProviderError::RetriesExhausted`], never an empty result.
 */

use async_trait::async_trait;
use log::{error, warn};
use rand::Rng;
use std::time::Duration;

use crate::errors::ProviderError;

use super::{ProviderRequest, ShortenRequest, TranslationProvider};

/// Provider decorator retrying `translate` calls
#[derive(Debug)]
pub struct RetryingProvider<P> {
    inner: P,
    /// Total attempts, including the first one
    max_attempts: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

impl<P: TranslationProvider> RetryingProvider<P> {
    pub fn new(inner: P, max_attempts: u32, backoff_base_ms: u64) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff_base_ms,
        }
    }

    /// The wrapped provider
    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(16));
        // up to 10% jitter so concurrent jobs do not retry in lockstep
        let jitter = if base > 0 {
            rand::rng().random_range(0..=base / 10)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}

#[async_trait]
impl<P: TranslationProvider> TranslationProvider for RetryingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn translate(&self, request: ProviderRequest) -> Result<Vec<String>, ProviderError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.inner.translate(request.clone()).await {
                Ok(texts) => return Ok(texts),
                Err(e) => e,
            };

            if !error.is_retryable() {
                error!("{} translate failed with non-retryable error: {}", self.inner.name(), error);
                return Err(error);
            }

            if attempt >= self.max_attempts {
                error!(
                    "{} translate failed after {} attempts: {}",
                    self.inner.name(),
                    attempt,
                    error
                );
                return Err(ProviderError::RetriesExhausted {
                    attempts: attempt,
                    last_error: Box::new(error),
                });
            }

            warn!(
                "{} translate failed: {} - attempt {}/{}",
                self.inner.name(),
                error,
                attempt,
                self.max_attempts
            );
            tokio::time::sleep(self.backoff(attempt)).await;
        }
    }

    async fn shorten(&self, request: ShortenRequest) -> Result<String, ProviderError> {
        self.inner.shorten(request).await
    }

    async fn usage(&self) -> Result<u64, ProviderError> {
        self.inner.usage().await
    }
}
