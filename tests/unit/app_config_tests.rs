/*!
 * Tests for application configuration functionality
 */

use content_translate::app_config::{BatchConfig, Config, LogLevel, ProviderConfig, ProviderKind};

/// A dummy provider needs no credentials
fn dummy_config() -> Config {
    Config {
        provider: ProviderConfig::new(ProviderKind::Dummy),
        ..Config::default()
    }
}

/// Test configuration validation of batch settings
#[test]
fn test_validate_withZeroBatchSettings_shouldFail() {
    assert!(dummy_config().validate().is_ok());

    let mut config = dummy_config();
    config.batch.record_attempts = 0;
    assert!(config.validate().is_err());

    let mut config = dummy_config();
    config.batch.max_concurrent_records = 0;
    assert!(config.validate().is_err());
}

/// Test that an OpenAI config validates once a key and a valid endpoint are set
#[test]
fn test_validate_withOpenAiKeyAndEndpoint_shouldPass() {
    let mut config = Config::default();
    config.provider.api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());

    config.provider.endpoint = "not a url".to_string();
    assert!(config.validate().is_err());
}

/// Test that an empty JSON object yields the default configuration
#[test]
fn test_deserialize_withEmptyObject_shouldUseDefaults() {
    let config: Config = serde_json::from_str("{}").unwrap();

    assert_eq!(config.provider.kind, ProviderKind::OpenAI);
    assert_eq!(config.provider.model, "gpt-4o-mini");
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.database_path.is_none());
    assert_eq!(config.batch.slice_size, BatchConfig::default().slice_size);
}

/// Test loading a config file written by hand
#[test]
fn test_load_withHandWrittenFile_shouldApplyOverrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "provider": {"type": "dummy", "api_options": {"temperature": 0.2}},
            "batch": {"slice_size": 10, "record_retry_delay_ms": 0},
            "database_path": "jobs.db",
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.provider.kind, ProviderKind::Dummy);
    assert_eq!(config.provider.api_options["temperature"], serde_json::json!(0.2));
    assert_eq!(config.batch.slice_size, 10);
    assert_eq!(config.batch.record_retry_delay_ms, 0);
    assert_eq!(config.batch.record_attempts, 3);
    assert_eq!(config.database_path.as_deref(), Some(std::path::Path::new("jobs.db")));
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);
}

/// Test that a malformed file is reported instead of silently defaulted
#[test]
fn test_load_withMalformedFile_shouldFail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load(&path).is_err());
    assert!(Config::load(&dir.path().join("missing.json")).is_err());
}
