/*!
 * Record translation using pluggable providers.
 *
 * This module contains the per-record pipeline. It is split into several
 * submodules:
 *
 * - `fields`: Field selection, format grouping and slug detection
 * - `slug`: Locale-aware slugification of translated slugs
 * - `translator`: Provider dispatch and reassembly of a translated record
 */

// Re-export main types for easier usage
pub use self::fields::{TextFormat, TranslatableField, estimate_usage, extract};
pub use self::slug::slugify;
pub use self::translator::{RecordTranslator, TranslateParams};

// Submodules
pub mod fields;
pub mod slug;
pub mod translator;
