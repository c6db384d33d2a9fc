/*!
 * Tests for record access and field extraction
 */

use serde_json::json;

use content_translate::record::{FieldPath, Record};
use content_translate::translation::{TextFormat, TranslatableField, estimate_usage, extract};

fn path(s: &str) -> FieldPath {
    s.parse().unwrap()
}

/// Test reading and writing through component and array paths
#[test]
fn test_record_withNestedPaths_shouldReadAndWrite() {
    let mut record = Record::new(json!({
        "seo": {"metaTitle": "Title"},
        "blocks": [{"text": "First"}, {"text": "Second"}]
    }));

    assert_eq!(record.get_str(&path("seo.metaTitle")), Some("Title"));
    assert_eq!(record.get_str(&path("blocks[1].text")), Some("Second"));
    assert_eq!(record.get_str(&path("blocks.0.text")), Some("First"));
    assert_eq!(record.get_str(&path("blocks[5].text")), None);

    record.set(&path("blocks[1].text"), json!("Zweite")).unwrap();
    assert_eq!(record.get_str(&path("blocks[1].text")), Some("Zweite"));
    assert_eq!(record.get_str(&path("blocks[0].text")), Some("First"));
}

/// Test that nested fields are grouped with top-level ones of the same format
#[test]
fn test_extract_withNestedFields_shouldGroupByFormat() {
    let record = Record::new(json!({
        "title": "Hello",
        "body": "# Heading",
        "seo": {"metaDescription": "About hello"}
    }));
    let fields = vec![
        TranslatableField::new("title", TextFormat::Plain),
        TranslatableField::new("body", TextFormat::Markdown),
        TranslatableField::new("seo.metaDescription", TextFormat::Plain),
    ];

    let groups = extract(&record, &fields).unwrap();

    assert_eq!(groups.len(), 2);
    let plain: Vec<String> = groups[&TextFormat::Plain].iter().map(|f| f.path.to_string()).collect();
    assert_eq!(plain, vec!["title", "seo.metaDescription"]);
    assert_eq!(groups[&TextFormat::Markdown][0].text, "# Heading");
}

/// Test that a record without any selected text yields no groups
#[test]
fn test_extract_withNoText_shouldReturnNoGroups() {
    let record = Record::new(json!({"title": "", "views": 12, "tags": ["a"]}));
    let fields = vec![
        TranslatableField::new("title", TextFormat::Plain),
        TranslatableField::new("views", TextFormat::Plain),
        TranslatableField::new("tags", TextFormat::Plain),
    ];

    assert!(extract(&record, &fields).unwrap().is_empty());
    assert_eq!(estimate_usage(&record, &fields), 0);
}

/// Test parsing field formats the way they appear in job parameters
#[test]
fn test_translatableField_shouldDeserializeWithDefaultFormat() {
    let fields: Vec<TranslatableField> = serde_json::from_value(json!([
        {"field": "title"},
        {"field": "body", "format": "html"}
    ]))
    .unwrap();

    assert_eq!(fields[0].format, TextFormat::Plain);
    assert_eq!(fields[1].format, TextFormat::Html);
    assert_eq!("MARKDOWN".parse::<TextFormat>().unwrap(), TextFormat::Markdown);
}
