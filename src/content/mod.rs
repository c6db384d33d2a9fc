/*!
 * Content store collaborator.
 *
 * The job manager reads untranslated records and writes translations through
 * the [`ContentStore`] trait. Records of a content type are identified by a
 * numeric id and slices are always returned in ascending id order.
 */

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::record::Record;

pub mod memory;

pub use memory::MemoryContentStore;

/// Description of a content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeInfo {
    /// Unique identifier, e.g. `api::article.article`
    pub uid: String,
    /// Human readable collection name
    pub display_name: String,
    /// Whether entries exist per locale
    #[serde(default)]
    pub localized: bool,
}

/// A configured locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleInfo {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// A record in the source locale awaiting translation
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: i64,
    pub data: Record,
}

/// Storage of translatable content
#[async_trait]
pub trait ContentStore: Send + Sync + Debug {
    /// All content types
    async fn content_types(&self) -> Result<Vec<ContentTypeInfo>>;

    /// All configured locales
    async fn locales(&self) -> Result<Vec<LocaleInfo>>;

    async fn has_content_type(&self, content_type: &str) -> Result<bool>;

    /// Number of entries of a content type in a locale
    async fn count(&self, content_type: &str, locale: &str) -> Result<u64>;

    /// Number of source entries lacking a translation into `target_locale`
    async fn count_untranslated(&self, content_type: &str, source_locale: &str, target_locale: &str)
    -> Result<u64>;

    /// Up to `limit` untranslated source entries with an id above `after_id`
    async fn untranslated_slice(
        &self,
        content_type: &str,
        source_locale: &str,
        target_locale: &str,
        after_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<SourceRecord>>;

    /// Store `record` as the `target_locale` translation of entry `source_id`
    async fn save_translation(
        &self,
        content_type: &str,
        source_id: i64,
        target_locale: &str,
        record: Record,
    ) -> Result<()>;

    /// Whether every entry of the content type exists in `locale`
    async fn is_fully_translated(&self, content_type: &str, locale: &str) -> Result<bool>;
}
