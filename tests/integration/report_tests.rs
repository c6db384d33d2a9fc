/*!
 * Tests for the per-locale translation report
 */

use std::sync::Arc;

use content_translate::database::Repository;
use content_translate::jobs::{JobStatus, SubmitJobParams};
use content_translate::providers::mock::MockProvider;
use content_translate::report::ProgressReporter;
use content_translate::translation::RecordTranslator;

use crate::common::{ARTICLE, article_store, job_manager, title_field, wait_for_status};

/// Test that the report reflects finished and cancelled jobs per locale
#[tokio::test]
async fn test_report_afterJobs_shouldShowCountsCompletenessAndLatestJob() {
    let store = article_store(20);
    store.add_content_type("api::page.page", "Page", true);
    let repo = Repository::new_in_memory().unwrap();
    let provider = Arc::new(MockProvider::working());
    let manager = job_manager(repo.clone(), store.clone(), provider.clone());

    let fr = manager
        .submit_job(SubmitJobParams::new(ARTICLE, "en", "fr", title_field()))
        .await
        .unwrap();
    wait_for_status(&manager, &fr, JobStatus::Completed).await;

    let reporter = ProgressReporter::new(repo, store, RecordTranslator::new(provider));
    let report = reporter.report().await.unwrap();

    assert_eq!(report.content_types.len(), 2);
    let article = report
        .content_types
        .iter()
        .find(|ct| ct.content_type == ARTICLE)
        .unwrap();
    assert_eq!(article.collection, "Article");

    let en = &article.locale_reports["en"];
    assert_eq!(en.count, 20);
    assert!(en.complete);
    assert!(en.job.is_none());

    let fr_report = &article.locale_reports["fr"];
    assert_eq!(fr_report.count, 20);
    assert!(fr_report.complete);
    let job = fr_report.job.as_ref().unwrap();
    assert_eq!(job.id, fr);
    assert_eq!(job.status, JobStatus::Completed);

    let de = &article.locale_reports["de"];
    assert_eq!(de.count, 0);
    assert!(!de.complete);
    assert!(de.job.is_none());

    // title characters sent to the provider
    let expected_usage: u64 = (1..=20).map(|i| format!("Article {}", i).chars().count() as u64).sum();
    assert_eq!(reporter.usage().await.unwrap(), expected_usage);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["locales"].as_array().unwrap().len(), 3);
    assert!(value["contentTypes"][0]["localeReports"]["fr"].get("count").is_some());
}
