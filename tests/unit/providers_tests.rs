/*!
 * Tests for provider implementations
 */

use std::sync::Arc;

use content_translate::app_config::{ProviderConfig, ProviderKind};
use content_translate::errors::ProviderError;
use content_translate::providers::mock::{MockBehavior, MockProvider};
use content_translate::providers::openai::{parse_translated_array, render_shorten_prompt};
use content_translate::providers::{
    ProviderRequest, RetryingProvider, ShortenRequest, TranslationProvider, build_provider,
};
use content_translate::translation::TextFormat;

fn request(texts: &[&str]) -> ProviderRequest {
    ProviderRequest {
        text: texts.iter().map(|t| t.to_string()).collect(),
        source_locale: "en".to_string(),
        target_locale: "fr".to_string(),
        priority: 0,
        format: TextFormat::Plain,
    }
}

/// Test that the dummy provider returns texts unchanged and counts usage
#[tokio::test]
async fn test_dummyProvider_shouldReturnTextsUnchanged() {
    let provider = build_provider(&ProviderConfig::new(ProviderKind::Dummy)).unwrap();

    let texts = provider.translate(request(&["Hello", "World"])).await.unwrap();

    assert_eq!(texts, vec!["Hello", "World"]);
    assert_eq!(provider.name(), "dummy");
    assert_eq!(provider.usage().await.unwrap(), 10);
}

/// Test that OpenAI construction does not need network access
#[test]
fn test_buildProvider_withOpenAi_shouldConstructOffline() {
    let mut config = ProviderConfig::new(ProviderKind::OpenAI);
    config.api_key = "sk-test".to_string();
    config.rate_limit = Some(60);

    let provider = build_provider(&config).unwrap();
    assert_eq!(provider.name(), "openai");
}

/// Test that the retry wrapper recovers from transient failures
#[tokio::test]
async fn test_retryingProvider_withFailFirst_shouldSucceed() {
    let mock = Arc::new(MockProvider::new(MockBehavior::FailFirst { failures: 2 }));
    let provider = RetryingProvider::new(mock.clone(), 3, 1);

    let texts = provider.translate(request(&["Hello"])).await.unwrap();

    assert_eq!(texts, vec!["[fr] Hello"]);
    assert_eq!(mock.call_count(), 3);
}

/// Test that exhausted retries report the attempts instead of an empty list
#[tokio::test]
async fn test_retryingProvider_withPersistentFailure_shouldReportAttempts() {
    let provider = RetryingProvider::new(MockProvider::failing(), 2, 1);

    let error = provider.translate(request(&["Hello"])).await.unwrap_err();

    match error {
        ProviderError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("unexpected error: {:?}", other),
    }
}

/// Test that shorten is passed through the retry wrapper
#[tokio::test]
async fn test_retryingProvider_shorten_shouldDelegate() {
    let provider = RetryingProvider::new(MockProvider::working(), 3, 1);

    let short = provider
        .shorten(ShortenRequest {
            text: "A rather long sentence".to_string(),
            length: 8,
        })
        .await
        .unwrap();

    assert_eq!(short, "A rather");
}

/// Test parsing of model answers
#[test]
fn test_parseTranslatedArray_withProse_shouldFail() {
    assert_eq!(parse_translated_array(r#"["un", "deux"]"#).unwrap(), vec!["un", "deux"]);
    assert!(parse_translated_array("Here is your translation: un, deux").is_err());
}

/// Test that the default shorten prompt carries the limit and the text
#[test]
fn test_renderShortenPrompt_withDefaultTemplate_shouldMentionLimitAndText() {
    let prompt = render_shorten_prompt(None, "Some text", 42);
    assert!(prompt.contains("42"));
    assert!(prompt.contains("Some text"));
}
