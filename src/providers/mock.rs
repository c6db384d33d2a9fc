/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::intermittent(n)` - Fails every nth request
 * - `MockProvider::failing()` - Always fails with an error
 *
 * Every request is recorded so tests can inspect what was sent.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{ProviderRequest, ShortenRequest, TranslationProvider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a translation
    Working,
    /// Fails the first `failures` requests, then works
    FailFirst { failures: usize },
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with a retryable error
    Failing,
    /// Always fails with an authentication error
    Unauthorized,
    /// Returns one text fewer than requested
    Mismatched,
    /// Simulates slow response
    Slow { delay_ms: u64 },
}

/// Maps one source text to its translation
pub type Translator = fn(&str, &ProviderRequest) -> String;

fn default_translator(text: &str, request: &ProviderRequest) -> String {
    format!("[{}] {}", request.target_locale, text)
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter
    request_count: Arc<AtomicUsize>,
    /// Every translate request received
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    /// Characters translated so far
    usage: Arc<AtomicU64>,
    /// Translation function
    translator: Translator,
    /// Requests containing this text fail
    failing_marker: Option<String>,
    /// Characters by which `shorten` overshoots the requested length
    shorten_overshoot: usize,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            usage: Arc::new(AtomicU64::new(0)),
            translator: default_translator,
            failing_marker: None,
            shorten_overshoot: 0,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Set a custom translation function
    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    /// Fail every request that contains `marker` in one of its texts
    pub fn with_failing_marker(mut self, marker: impl Into<String>) -> Self {
        self.failing_marker = Some(marker.into());
        self
    }

    /// Make `shorten` return `overshoot` characters more than requested
    pub fn with_shorten_overshoot(mut self, overshoot: usize) -> Self {
        self.shorten_overshoot = overshoot;
        self
    }

    /// Number of translate calls made
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the translate requests received
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().clone()
    }

    fn fail(message: &str) -> ProviderError {
        ProviderError::ApiError {
            status_code: 503,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(&self, request: ProviderRequest) -> Result<Vec<String>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if let Some(marker) = &self.failing_marker {
            if request.text.iter().any(|t| t.contains(marker.as_str())) {
                return Err(Self::fail("Simulated failure for marked text"));
            }
        }

        match self.behavior {
            MockBehavior::Working => {}
            MockBehavior::FailFirst { failures } => {
                if count < failures {
                    return Err(Self::fail("Simulated transient failure"));
                }
            }
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    return Err(Self::fail("Simulated intermittent failure"));
                }
            }
            MockBehavior::Failing => {
                return Err(ProviderError::ConnectionError("Simulated connection failure".to_string()));
            }
            MockBehavior::Unauthorized => {
                return Err(ProviderError::AuthenticationError("Invalid API key".to_string()));
            }
            MockBehavior::Mismatched => {
                let mut texts: Vec<String> = request
                    .text
                    .iter()
                    .map(|t| (self.translator)(t, &request))
                    .collect();
                texts.pop();
                return Ok(texts);
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
        }

        let chars: usize = request.text.iter().map(|t| t.chars().count()).sum();
        self.usage.fetch_add(chars as u64, Ordering::SeqCst);

        Ok(request
            .text
            .iter()
            .map(|t| (self.translator)(t, &request))
            .collect())
    }

    async fn shorten(&self, request: ShortenRequest) -> Result<String, ProviderError> {
        let keep = request.length + self.shorten_overshoot;
        Ok(request.text.chars().take(keep).collect())
    }

    async fn usage(&self) -> Result<u64, ProviderError> {
        Ok(self.usage.load(Ordering::SeqCst))
    }
}
