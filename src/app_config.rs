use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::language_utils;

/// Settings read from `conf.json`; every section falls back to its defaults
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Translation provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Batch job settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Job database location (platform data directory when unset)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    // @provider: OpenAI chat completions
    #[default]
    OpenAI,
    // @provider: Returns texts unchanged
    Dummy,
}

impl ProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Dummy => "Dummy",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Dummy => "dummy".to_string(),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "dummy" => Ok(Self::Dummy),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type", default)]
    pub kind: ProviderKind,

    // @field: Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Internal locale code to provider locale code
    #[serde(default)]
    pub locale_map: HashMap<String, String>,

    /// Provider specific options merged into every request body
    #[serde(default)]
    pub api_options: serde_json::Map<String, serde_json::Value>,

    /// Template overriding the shortening instruction
    /// Placeholders: {length}, {text}
    #[serde(default)]
    pub shorten_prompt: Option<String>,

    /// Attempts for a batch translate call
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            model: default_openai_model(),
            api_key: String::new(),
            endpoint: default_openai_endpoint(),
            timeout_secs: default_timeout_secs(),
            locale_map: HashMap::new(),
            api_options: serde_json::Map::new(),
            shorten_prompt: None,
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit: None,
            max_concurrent_requests: default_concurrent_requests(),
        }
    }
}

impl ProviderConfig {
    /// Defaults for the given provider type
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

/// Batch job settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Records fetched and processed between pause/cancel checkpoints
    #[serde(default = "default_slice_size")]
    pub slice_size: usize,

    /// Attempts per record before it is counted as failed
    #[serde(default = "default_record_attempts")]
    pub record_attempts: u32,

    /// Records of one slice translated concurrently
    #[serde(default = "default_concurrent_records")]
    pub max_concurrent_records: usize,

    /// Delay between attempts of the same record
    #[serde(default = "default_record_retry_delay_ms")]
    pub record_retry_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            slice_size: default_slice_size(),
            record_attempts: default_record_attempts(),
            max_concurrent_records: default_concurrent_records(),
            record_retry_delay_ms: default_record_retry_delay_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_slice_size() -> usize {
    50
}

fn default_record_attempts() -> u32 {
    3
}

fn default_concurrent_records() -> usize {
    4
}

fn default_record_retry_delay_ms() -> u64 {
    250
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Config {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let provider = &self.provider;

        if provider.kind == ProviderKind::OpenAI && provider.api_key.is_empty() {
            return Err(anyhow!("Translation API key is required for OpenAI provider"));
        }

        if provider.kind == ProviderKind::OpenAI {
            url::Url::parse(&provider.endpoint)
                .with_context(|| format!("Invalid provider endpoint: {}", provider.endpoint))?;
        }

        if provider.retry_count == 0 {
            return Err(anyhow!("retry_count must be at least 1"));
        }

        if provider.max_concurrent_requests == 0 {
            return Err(anyhow!("max_concurrent_requests must be at least 1"));
        }

        for locale in provider.locale_map.keys() {
            language_utils::validate_locale_code(locale)
                .with_context(|| format!("Invalid key in locale_map: {}", locale))?;
        }

        if self.batch.slice_size == 0 {
            return Err(anyhow!("slice_size must be at least 1"));
        }

        if self.batch.record_attempts == 0 {
            return Err(anyhow!("record_attempts must be at least 1"));
        }

        if self.batch.max_concurrent_records == 0 {
            return Err(anyhow!("max_concurrent_records must be at least 1"));
        }

        Ok(())
    }
}
