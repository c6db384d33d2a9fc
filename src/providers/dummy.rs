use async_trait::async_trait;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::ProviderError;

use super::{ProviderOptions, ProviderRequest, ShortenRequest, TranslationProvider};

/// Provider returning every text unchanged
///
/// Useful for wiring up locales before a real provider is configured.
#[derive(Debug)]
pub struct DummyProvider {
    options: ProviderOptions,
    /// Characters seen so far
    usage: AtomicU64,
}

impl DummyProvider {
    pub fn new(options: ProviderOptions) -> Self {
        Self {
            options,
            usage: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }
}

#[async_trait]
impl TranslationProvider for DummyProvider {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn translate(&self, request: ProviderRequest) -> Result<Vec<String>, ProviderError> {
        let chars: usize = request.text.iter().map(|t| t.chars().count()).sum();
        self.usage.fetch_add(chars as u64, Ordering::Relaxed);
        debug!(
            "Dummy translation of {} {} texts {} -> {}",
            request.text.len(),
            request.format,
            request.source_locale,
            request.target_locale
        );
        Ok(request.text)
    }

    async fn shorten(&self, request: ShortenRequest) -> Result<String, ProviderError> {
        Ok(request.text.chars().take(request.length).collect())
    }

    async fn usage(&self) -> Result<u64, ProviderError> {
        Ok(self.usage.load(Ordering::Relaxed))
    }
}
