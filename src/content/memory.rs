use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::record::Record;

use super::{ContentStore, ContentTypeInfo, LocaleInfo, SourceRecord};

/// One stored entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: i64,
    pub locale: String,
    /// Id of the entry this one localizes, `None` for originals
    #[serde(default)]
    pub localization_of: Option<i64>,
    pub data: Record,
}

impl Entry {
    /// Id shared by an entry and all its localizations
    fn group(&self) -> i64 {
        self.localization_of.unwrap_or(self.id)
    }
}

/// A content type and its entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeData {
    #[serde(flatten)]
    pub info: ContentTypeInfo,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// Serialized form of a content export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentExport {
    #[serde(default)]
    pub locales: Vec<LocaleInfo>,
    #[serde(default)]
    pub content_types: Vec<ContentTypeData>,
}

/// In-memory content store backed by a JSON export
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    data: RwLock<ContentExport>,
}

impl MemoryContentStore {
    pub fn new(export: ContentExport) -> Self {
        Self {
            data: RwLock::new(export),
        }
    }

    /// Load an export file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read content file: {}", path.display()))?;
        let export: ContentExport = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse content file: {}", path.display()))?;
        debug!(
            "Loaded {} content types from {}",
            export.content_types.len(),
            path.display()
        );
        Ok(Self::new(export))
    }

    /// Write the current content back to an export file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&*self.data.read())?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write content file: {}", path.display()))
    }

    /// Copy of the current content
    pub fn snapshot(&self) -> ContentExport {
        self.data.read().clone()
    }

    /// Add a locale
    pub fn add_locale(&self, code: &str) {
        self.data.write().locales.push(LocaleInfo {
            code: code.to_string(),
            name: code.to_string(),
            is_default: false,
        });
    }

    /// Add a content type without entries
    pub fn add_content_type(&self, uid: &str, display_name: &str, localized: bool) {
        self.data.write().content_types.push(ContentTypeData {
            info: ContentTypeInfo {
                uid: uid.to_string(),
                display_name: display_name.to_string(),
                localized,
            },
            entries: Vec::new(),
        });
    }

    /// Insert an original entry, returning its id
    pub fn insert(&self, content_type: &str, locale: &str, data: Record) -> Result<i64> {
        let mut export = self.data.write();
        let ct = find_mut(&mut export, content_type)?;
        let id = next_id(ct);
        ct.entries.push(Entry {
            id,
            locale: locale.to_string(),
            localization_of: None,
            data,
        });
        Ok(id)
    }

    /// Localization of entry `source_id` in `locale`, if any
    pub fn translation_of(&self, content_type: &str, source_id: i64, locale: &str) -> Option<Record> {
        let export = self.data.read();
        let ct = export.content_types.iter().find(|c| c.info.uid == content_type)?;
        let group = ct.entries.iter().find(|e| e.id == source_id)?.group();
        ct.entries
            .iter()
            .find(|e| e.locale == locale && e.group() == group)
            .map(|e| e.data.clone())
    }
}

fn find<'a>(export: &'a ContentExport, content_type: &str) -> Result<&'a ContentTypeData> {
    export
        .content_types
        .iter()
        .find(|c| c.info.uid == content_type)
        .ok_or_else(|| anyhow!("Unknown content type: {}", content_type))
}

fn find_mut<'a>(export: &'a mut ContentExport, content_type: &str) -> Result<&'a mut ContentTypeData> {
    export
        .content_types
        .iter_mut()
        .find(|c| c.info.uid == content_type)
        .ok_or_else(|| anyhow!("Unknown content type: {}", content_type))
}

fn next_id(ct: &ContentTypeData) -> i64 {
    ct.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1
}

/// Groups already localized into `locale`
fn translated_groups(ct: &ContentTypeData, locale: &str) -> HashSet<i64> {
    ct.entries
        .iter()
        .filter(|e| e.locale == locale)
        .map(Entry::group)
        .collect()
}

fn untranslated<'a>(
    ct: &'a ContentTypeData,
    source_locale: &'a str,
    target_locale: &str,
) -> impl Iterator<Item = &'a Entry> {
    let done = translated_groups(ct, target_locale);
    ct.entries
        .iter()
        .filter(move |e| e.locale == source_locale && !done.contains(&e.group()))
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn content_types(&self) -> Result<Vec<ContentTypeInfo>> {
        Ok(self
            .data
            .read()
            .content_types
            .iter()
            .map(|c| c.info.clone())
            .collect())
    }

    async fn locales(&self) -> Result<Vec<LocaleInfo>> {
        Ok(self.data.read().locales.clone())
    }

    async fn has_content_type(&self, content_type: &str) -> Result<bool> {
        Ok(find(&self.data.read(), content_type).is_ok())
    }

    async fn count(&self, content_type: &str, locale: &str) -> Result<u64> {
        let export = self.data.read();
        let ct = find(&export, content_type)?;
        Ok(ct.entries.iter().filter(|e| e.locale == locale).count() as u64)
    }

    async fn count_untranslated(&self, content_type: &str, source_locale: &str, target_locale: &str)
    -> Result<u64> {
        let export = self.data.read();
        let ct = find(&export, content_type)?;
        Ok(untranslated(ct, source_locale, target_locale).count() as u64)
    }

    async fn untranslated_slice(
        &self,
        content_type: &str,
        source_locale: &str,
        target_locale: &str,
        after_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<SourceRecord>> {
        let export = self.data.read();
        let ct = find(&export, content_type)?;
        let mut slice: Vec<SourceRecord> = untranslated(ct, source_locale, target_locale)
            .filter(|e| after_id.is_none_or(|after| e.id > after))
            .map(|e| SourceRecord {
                id: e.id,
                data: e.data.clone(),
            })
            .collect();
        slice.sort_by_key(|r| r.id);
        slice.truncate(limit);
        Ok(slice)
    }

    async fn save_translation(
        &self,
        content_type: &str,
        source_id: i64,
        target_locale: &str,
        record: Record,
    ) -> Result<()> {
        let mut export = self.data.write();
        let ct = find_mut(&mut export, content_type)?;
        let group = ct
            .entries
            .iter()
            .find(|e| e.id == source_id)
            .map(Entry::group)
            .ok_or_else(|| anyhow!("Entry {} not found in {}", source_id, content_type))?;

        if let Some(existing) = ct
            .entries
            .iter_mut()
            .find(|e| e.locale == target_locale && e.group() == group)
        {
            existing.data = record;
            return Ok(());
        }

        let id = next_id(ct);
        ct.entries.push(Entry {
            id,
            locale: target_locale.to_string(),
            localization_of: Some(group),
            data: record,
        });
        Ok(())
    }

    async fn is_fully_translated(&self, content_type: &str, locale: &str) -> Result<bool> {
        let export = self.data.read();
        let ct = find(&export, content_type)?;
        let done = translated_groups(ct, locale);
        Ok(ct.entries.iter().all(|e| done.contains(&e.group())))
    }
}
