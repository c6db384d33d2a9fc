/*!
 * Provider implementations for different translation services.
 *
 * This module contains the adapter contract the translation pipeline depends
 * on and its implementations:
 * - OpenAI: chat completions API integration
 * - Dummy: returns texts unchanged
 * - Mock: scripted behaviors for tests
 *
 * Concrete providers are selected by configuration at startup and wrapped in
 * a [`RetryingProvider`].
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{ProviderConfig, ProviderKind};
use crate::errors::ProviderError;
use crate::translation::fields::TextFormat;

pub mod dummy;
pub mod mock;
pub mod openai;
pub mod retry;

pub use retry::RetryingProvider;

/// A batch translate call
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    /// Texts to translate, in order
    pub text: Vec<String>,
    /// Source locale code
    pub source_locale: String,
    /// Target locale code
    pub target_locale: String,
    /// Job priority, forwarded to providers that queue work
    pub priority: i64,
    /// Markup dialect shared by all texts
    pub format: TextFormat,
}

/// A shorten call
#[derive(Debug, Clone, PartialEq)]
pub struct ShortenRequest {
    /// Text to shorten
    pub text: String,
    /// Maximum length in characters
    pub length: usize,
}

/// Options recognized at provider initialization
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    /// Credential for the provider API
    pub api_key: String,
    /// Internal locale code to provider locale code
    pub locale_map: HashMap<String, String>,
    /// Provider specific passthrough options
    pub api_options: serde_json::Map<String, serde_json::Value>,
    /// Template overriding the default shortening instruction
    pub shorten_prompt: Option<String>,
}

impl ProviderOptions {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            locale_map: config.locale_map.clone(),
            api_options: config.api_options.clone(),
            shorten_prompt: config.shorten_prompt.clone(),
        }
    }
}

/// Common trait for all translation providers
///
/// This trait defines the capability the translation pipeline depends on,
/// allowing providers to be used interchangeably.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Short identifier of the provider
    fn name(&self) -> &str;

    /// Translate texts, returning a list of the same length and order
    async fn translate(&self, request: ProviderRequest) -> Result<Vec<String>, ProviderError>;

    /// Produce a text of at most `request.length` characters
    ///
    /// Providers may overshoot; callers that need a hard bound should use
    /// [`crate::translation::RecordTranslator::shorten_to_fit`].
    async fn shorten(&self, request: ShortenRequest) -> Result<String, ProviderError>;

    /// Cumulative usage metric, advisory only
    async fn usage(&self) -> Result<u64, ProviderError>;
}

#[async_trait]
impl<P: TranslationProvider + ?Sized> TranslationProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn translate(&self, request: ProviderRequest) -> Result<Vec<String>, ProviderError> {
        (**self).translate(request).await
    }

    async fn shorten(&self, request: ShortenRequest) -> Result<String, ProviderError> {
        (**self).shorten(request).await
    }

    async fn usage(&self) -> Result<u64, ProviderError> {
        (**self).usage().await
    }
}

/// Build the configured provider wrapped with retry
pub fn build_provider(config: &ProviderConfig) -> anyhow::Result<Arc<dyn TranslationProvider>> {
    let options = ProviderOptions::from_config(config);

    let provider: Arc<dyn TranslationProvider> = match config.kind {
        ProviderKind::OpenAI => Arc::new(RetryingProvider::new(
            openai::OpenAI::new_with_config(config, options)?,
            config.retry_count,
            config.retry_backoff_ms,
        )),
        ProviderKind::Dummy => Arc::new(RetryingProvider::new(
            dummy::DummyProvider::new(options),
            config.retry_count,
            config.retry_backoff_ms,
        )),
    };

    log::info!("Using {} translation provider", config.kind.display_name());
    Ok(provider)
}
