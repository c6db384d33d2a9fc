/*!
 * Single record translation.
 *
 * Extracted field groups are dispatched concurrently, one provider call per
 * format, and reassembled into a copy of the record. Nothing is written back
 * unless every group succeeded.
 */

use futures::future::try_join_all;
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;

use crate::errors::{ProviderError, TranslationError};
use crate::providers::{ProviderRequest, ShortenRequest, TranslationProvider};
use crate::record::Record;

use super::fields::{self, ExtractedField, TextFormat, TranslatableField};
use super::slug::slugify;

/// Number of shorten calls made before giving up
pub const SHORTEN_ATTEMPTS: u32 = 8;

/// Parameters of one record translation
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateParams {
    pub source_locale: String,
    pub target_locale: String,
    pub fields_to_translate: Vec<TranslatableField>,
    pub priority: i64,
}

/// Translates records through a provider
#[derive(Debug, Clone)]
pub struct RecordTranslator {
    provider: Arc<dyn TranslationProvider>,
}

impl RecordTranslator {
    pub fn new(provider: Arc<dyn TranslationProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn TranslationProvider> {
        &self.provider
    }

    /// Translate a record, returning a new record
    ///
    /// The input is returned unchanged when both locales are equal.
    pub async fn translate(&self, record: &Record, params: &TranslateParams) -> Result<Record, TranslationError> {
        if params.source_locale == params.target_locale {
            return Ok(record.clone());
        }

        let groups = fields::extract(record, &params.fields_to_translate)?;
        if groups.is_empty() {
            return Ok(record.clone());
        }

        let dispatches = groups
            .into_iter()
            .map(|(format, group)| self.translate_group(format, group, params));
        let translated = try_join_all(dispatches).await?;

        let mut output = record.clone();
        for (group, texts) in translated {
            for (field, text) in group.into_iter().zip(texts) {
                let value = if field.is_slug {
                    slugify(&text, &params.target_locale)
                } else {
                    text
                };
                output.set(&field.path, Value::String(value))?;
            }
        }

        Ok(output)
    }

    async fn translate_group(
        &self,
        format: TextFormat,
        group: Vec<ExtractedField>,
        params: &TranslateParams,
    ) -> Result<(Vec<ExtractedField>, Vec<String>), TranslationError> {
        let request = ProviderRequest {
            text: group.iter().map(|f| f.text.clone()).collect(),
            source_locale: params.source_locale.clone(),
            target_locale: params.target_locale.clone(),
            priority: params.priority,
            format,
        };
        debug!("Dispatching {} {} fields to {}", group.len(), format, self.provider.name());

        let texts = self.provider.translate(request).await?;
        if texts.len() != group.len() {
            return Err(ProviderError::ResultMismatch {
                expected: group.len(),
                actual: texts.len(),
            }
            .into());
        }

        Ok((group, texts))
    }

    /// Shorten a text until it fits in `max_length` characters
    ///
    /// Each overshooting answer lowers the requested length to
    /// `max(length - 20, length / 2)`.
    pub async fn shorten_to_fit(&self, text: &str, max_length: usize) -> Result<String, TranslationError> {
        if text.chars().count() <= max_length {
            return Ok(text.to_string());
        }

        let mut target = max_length;
        let mut best_length = text.chars().count();

        for attempt in 1..=SHORTEN_ATTEMPTS {
            let candidate = self
                .provider
                .shorten(ShortenRequest {
                    text: text.to_string(),
                    length: target,
                })
                .await?;

            let length = candidate.chars().count();
            if length <= max_length {
                return Ok(candidate);
            }

            best_length = best_length.min(length);
            warn!(
                "Shortened text has {} characters, limit is {} (attempt {}/{})",
                length, max_length, attempt, SHORTEN_ATTEMPTS
            );
            target = target.saturating_sub(20).max(target / 2);
        }

        Err(TranslationError::LengthExceeded {
            max_length,
            attempts: SHORTEN_ATTEMPTS,
            best_length,
        })
    }

    /// Character count a translation of `record` would send
    pub fn estimate_usage(&self, record: &Record, fields: &[TranslatableField]) -> usize {
        fields::estimate_usage(record, fields)
    }

    /// Cumulative provider usage
    pub async fn usage(&self) -> Result<u64, TranslationError> {
        Ok(self.provider.usage().await?)
    }
}
