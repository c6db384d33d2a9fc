/*!
 * End-to-end tests of the per-record translation pipeline
 */

use serde_json::json;
use std::sync::Arc;

use content_translate::app_config::{ProviderConfig, ProviderKind};
use content_translate::errors::{ProviderError, TranslationError};
use content_translate::providers::mock::{MockBehavior, MockProvider};
use content_translate::providers::{ProviderRequest, build_provider};
use content_translate::record::Record;
use content_translate::translation::{RecordTranslator, TextFormat, TranslatableField, TranslateParams};

fn params(source: &str, target: &str, fields: Vec<TranslatableField>) -> TranslateParams {
    TranslateParams {
        source_locale: source.to_string(),
        target_locale: target.to_string(),
        fields_to_translate: fields,
        priority: 3,
    }
}

fn french(text: &str, _request: &ProviderRequest) -> String {
    match text {
        "hello world" => "bonjour le monde".to_string(),
        "Hello there" => "Bonjour".to_string(),
        other => format!("FR {}", other),
    }
}

/// Test the canonical article scenario
#[tokio::test]
async fn test_translate_withSlugAndBody_shouldProduceFrenchRecord() {
    let mock = MockProvider::working().with_translator(french);
    let translator = RecordTranslator::new(Arc::new(mock.clone()));
    let record = Record::new(json!({"title": "hello-world", "body": "Hello there"}));
    let fields = vec![
        TranslatableField::new("title", TextFormat::Plain),
        TranslatableField::new("body", TextFormat::Plain),
    ];

    let output = translator.translate(&record, &params("en", "fr", fields)).await.unwrap();

    assert_eq!(output, Record::new(json!({"title": "bonjour-le-monde", "body": "Bonjour"})));
    assert_eq!(record, Record::new(json!({"title": "hello-world", "body": "Hello there"})));

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].text, vec!["hello world", "Hello there"]);
    assert_eq!(requests[0].priority, 3);
}

/// Test a record with nested components, mixed formats and unselected fields
#[tokio::test]
async fn test_translate_withNestedMixedFormats_shouldOnlyTouchSelectedFields() {
    let mock = MockProvider::working().with_translator(french);
    let translator = RecordTranslator::new(Arc::new(mock.clone()));
    let record = Record::new(json!({
        "title": "Guide",
        "body": "## Intro",
        "blocks": [
            {"__component": "shared.rich-text", "html": "<p>First</p>"},
            {"__component": "shared.quote", "text": "   "}
        ],
        "seo": {"metaTitle": "Guide SEO", "canonical": "https://example.com/guide"}
    }));
    let fields = vec![
        TranslatableField::new("title", TextFormat::Plain),
        TranslatableField::new("body", TextFormat::Markdown),
        TranslatableField::new("blocks[0].html", TextFormat::Html),
        TranslatableField::new("blocks[1].text", TextFormat::Plain),
        TranslatableField::new("seo.metaTitle", TextFormat::Plain),
    ];

    let output = translator.translate(&record, &params("en", "fr-CA", fields)).await.unwrap();

    assert_eq!(
        output,
        Record::new(json!({
            "title": "FR Guide",
            "body": "FR ## Intro",
            "blocks": [
                {"__component": "shared.rich-text", "html": "FR <p>First</p>"},
                {"__component": "shared.quote", "text": "   "}
            ],
            "seo": {"metaTitle": "FR Guide SEO", "canonical": "https://example.com/guide"}
        }))
    );

    let mut formats: Vec<(TextFormat, usize)> = mock
        .requests()
        .iter()
        .map(|r| (r.format, r.text.len()))
        .collect();
    formats.sort();
    assert_eq!(
        formats,
        vec![(TextFormat::Plain, 2), (TextFormat::Markdown, 1), (TextFormat::Html, 1)]
    );
}

/// Test that every re-slugified value is URL safe
#[tokio::test]
async fn test_translate_withSlugFields_shouldProduceUrlSafeSlugs() {
    fn shouty(text: &str, _request: &ProviderRequest) -> String {
        format!("L'Été \"{}\" À Paris", text.to_uppercase())
    }
    let translator = RecordTranslator::new(Arc::new(MockProvider::working().with_translator(shouty)));
    let record = Record::new(json!({"slug": "summer_in-paris"}));
    let fields = vec![TranslatableField::new("slug", TextFormat::Plain)];

    let output = translator.translate(&record, &params("en", "fr", fields)).await.unwrap();

    let slug = output.as_value()["slug"].as_str().unwrap();
    assert_eq!(slug, "lete-summer-in-paris-a-paris");
    assert!(!slug.chars().any(|c| c.is_uppercase() || c == '_' || c == '\'' || c == '"'));
}

/// Test that a locale pair with equal codes never reaches the provider
#[tokio::test]
async fn test_translate_withEqualLocales_shouldReturnInputUnchanged() {
    let mock = MockProvider::failing();
    let translator = RecordTranslator::new(Arc::new(mock.clone()));
    let record = Record::new(json!({"title": "Hello"}));
    let fields = vec![TranslatableField::new("title", TextFormat::Plain)];

    let output = translator.translate(&record, &params("en", "en", fields)).await.unwrap();

    assert_eq!(output, record);
    assert_eq!(mock.call_count(), 0);
}

/// Test that a short answer fails the record instead of misaligning fields
#[tokio::test]
async fn test_translate_withShortAnswer_shouldReportMismatch() {
    let translator = RecordTranslator::new(Arc::new(MockProvider::new(MockBehavior::Mismatched)));
    let record = Record::new(json!({"a": "One", "b": "Two"}));
    let fields = vec![
        TranslatableField::new("a", TextFormat::Plain),
        TranslatableField::new("b", TextFormat::Plain),
    ];

    let error = translator.translate(&record, &params("en", "de", fields)).await.unwrap_err();

    assert!(matches!(
        error,
        TranslationError::Provider(ProviderError::ResultMismatch { expected: 2, actual: 1 })
    ));
}

/// Test the configured dummy provider through the pipeline
#[tokio::test]
async fn test_translate_withDummyProvider_shouldKeepTextsAndNormalizeSlugs() {
    let provider = build_provider(&ProviderConfig::new(ProviderKind::Dummy)).unwrap();
    let translator = RecordTranslator::new(provider);
    let record = Record::new(json!({"title": "Hello", "slug": "Hello_World"}));
    let fields = vec![
        TranslatableField::new("title", TextFormat::Plain),
        TranslatableField::new("slug", TextFormat::Plain),
    ];

    let output = translator.translate(&record, &params("en", "de", fields)).await.unwrap();

    assert_eq!(output, Record::new(json!({"title": "Hello", "slug": "hello-world"})));
    assert_eq!(translator.usage().await.unwrap(), 16);
    assert_eq!(translator.estimate_usage(&record, &[TranslatableField::new("title", TextFormat::Plain)]), 5);
}

/// Test the shortening policy against the dummy provider
#[tokio::test]
async fn test_shortenToFit_withDummyProvider_shouldRespectBound() {
    let provider = build_provider(&ProviderConfig::new(ProviderKind::Dummy)).unwrap();
    let translator = RecordTranslator::new(provider);

    let short = translator.shorten_to_fit("Ein ziemlich langer Titel", 10).await.unwrap();
    assert_eq!(short.chars().count(), 10);

    let untouched = translator.shorten_to_fit("Kurz", 10).await.unwrap();
    assert_eq!(untouched, "Kurz");
}
