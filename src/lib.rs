/*!
 * # content-translate
 *
 * A Rust library for batch translation of structured content records.
 *
 * ## Features
 *
 * - Translate the text fields of records through pluggable providers:
 *   - OpenAI chat completions API
 *   - Dummy provider returning texts unchanged
 * - One provider call per text format (plain, markdown, html) per record
 * - Locale-aware re-slugification of slug fields
 * - Resumable batch jobs with pause, resume and cancel
 * - Single active job per content type and target locale
 * - Per-locale completion reports
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `record`: Records as JSON trees with path-based access
 * - `translation`: Per-record translation pipeline:
 *   - `translation::fields`: Field extraction and format grouping
 *   - `translation::slug`: Slugification
 *   - `translation::translator`: Provider dispatch and reassembly
 * - `providers`: Translation provider adapters and retry wrapper
 * - `content`: Content store trait and in-memory implementation
 * - `database`: SQLite job persistence
 * - `jobs`: Batch job manager and per-job scheduler
 * - `report`: Progress reports per content type and locale
 * - `app_controller`: Main application controller
 * - `language_utils`: Locale code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
// Test names follow test_method_shouldBehavior
#![cfg_attr(test, allow(non_snake_case))]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod content;
pub mod database;
pub mod errors;
pub mod jobs;
pub mod language_utils;
pub mod providers;
pub mod record;
pub mod report;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use content::{ContentStore, MemoryContentStore};
pub use errors::{AppError, JobError, ProviderError, TranslationError};
pub use jobs::{BatchJob, BatchJobManager, JobProgress, JobStatus, SubmitJobParams};
pub use language_utils::{get_language_name, validate_locale_code};
pub use providers::TranslationProvider;
pub use record::{FieldPath, Record};
pub use report::{ProgressReporter, Report};
pub use translation::{RecordTranslator, TextFormat, TranslatableField, TranslateParams};
