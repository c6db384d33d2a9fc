/*!
 * Field extraction for record translation.
 *
 * Selects the non-empty translatable fields of a record, groups them by text
 * format and flags fields whose content looks like a slug.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::TranslationError;
use crate::record::{FieldPath, Record};

/// Markup dialect of a text field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
    Html,
}

impl fmt::Display for TextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextFormat::Plain => write!(f, "plain"),
            TextFormat::Markdown => write!(f, "markdown"),
            TextFormat::Html => write!(f, "html"),
        }
    }
}

impl std::str::FromStr for TextFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(TextFormat::Plain),
            "markdown" => Ok(TextFormat::Markdown),
            "html" => Ok(TextFormat::Html),
            _ => Err(anyhow::anyhow!("Invalid text format: {}", s)),
        }
    }
}

/// A field selected for translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatableField {
    /// Path into the record
    pub field: String,
    /// Text format of the field
    #[serde(default)]
    pub format: TextFormat,
}

impl TranslatableField {
    pub fn new(field: impl Into<String>, format: TextFormat) -> Self {
        Self {
            field: field.into(),
            format,
        }
    }

    /// Parse the field path
    pub fn path(&self) -> Result<FieldPath, TranslationError> {
        self.field.parse()
    }
}

/// A field pulled out of a record, ready to be sent to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedField {
    /// Parsed path of the field
    pub path: FieldPath,
    /// Text as sent to the provider (slug separators replaced by spaces)
    pub text: String,
    /// Whether the translation must be re-slugified
    pub is_slug: bool,
}

/// Extracted fields grouped by format, each group in field order
pub type FormatGroups = BTreeMap<TextFormat, Vec<ExtractedField>>;

/// True for hyphen/underscore joined text without spaces
pub fn is_slug(text: &str) -> bool {
    text.contains(['-', '_']) && !text.contains(' ')
}

/// Turn a slug back into natural-language text
pub fn despace_slug(text: &str) -> String {
    text.replace(['-', '_'], " ")
}

/// Group the non-empty translatable fields of a record by format
pub fn extract(record: &Record, fields: &[TranslatableField]) -> Result<FormatGroups, TranslationError> {
    let mut groups = FormatGroups::new();

    for field in fields {
        let path = field.path()?;
        let raw = match record.get_str(&path) {
            Some(text) if !text.trim().is_empty() => text,
            _ => continue,
        };

        let is_slug = is_slug(raw);
        let text = if is_slug {
            despace_slug(raw)
        } else {
            raw.to_string()
        };

        groups.entry(field.format).or_default().push(ExtractedField {
            path,
            text,
            is_slug,
        });
    }

    Ok(groups)
}

/// Character count of every selected field, used for cost estimates
pub fn estimate_usage(record: &Record, fields: &[TranslatableField]) -> usize {
    fields
        .iter()
        .filter_map(|f| f.path().ok())
        .filter_map(|path| record.get_str(&path).map(|s| s.chars().count()))
        .sum()
}
