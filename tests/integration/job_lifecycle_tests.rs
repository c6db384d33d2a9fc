/*!
 * Tests for the batch job lifecycle: submission, single-flight, pause,
 * resume, cancel and failure handling
 */

use std::sync::Arc;
use std::time::Duration;

use content_translate::app_config::BatchConfig;
use content_translate::content::ContentStore;
use content_translate::database::Repository;
use content_translate::errors::JobError;
use content_translate::jobs::{BatchJobManager, JobStatus, SubmitJobParams};
use content_translate::providers::mock::{MockBehavior, MockProvider};
use content_translate::record::Record;
use content_translate::translation::{RecordTranslator, TextFormat, TranslatableField};

use crate::common::{
    ARTICLE, FailingSaveStore, GatedProvider, article_store, init_logging, job_manager, test_batch_config,
    title_field, wait_for_status, wait_until, working_manager,
};

fn params(target: &str) -> SubmitJobParams {
    SubmitJobParams::new(ARTICLE, "en", target, title_field())
}

/// Manager whose provider holds every call until the gate opens
fn gated_manager(store: Arc<dyn ContentStore>) -> (BatchJobManager, Arc<GatedProvider>) {
    let provider = Arc::new(GatedProvider::new(0));
    let repo = Repository::new_in_memory().unwrap();
    (job_manager(repo, store, provider.clone()), provider)
}

/// Run a control operation while the first slice is held, then release it
async fn while_slice_in_flight<F, Fut>(provider: &GatedProvider, operation: F) -> Result<(), JobError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<(), JobError>> + Send + 'static,
{
    provider.wait_until_reached().await;
    let pending = tokio::spawn(operation());
    tokio::time::sleep(Duration::from_millis(50)).await;
    provider.open();
    pending.await.unwrap()
}

/// Test that a submitted job translates every record and completes
#[tokio::test]
async fn test_submitJob_shouldTranslateAllRecordsAndComplete() {
    init_logging();
    let store = article_store(120);
    let (manager, provider) = working_manager(store.clone());

    let job_id = manager.submit_job(params("fr").with_priority(2)).await.unwrap();
    let job = wait_for_status(&manager, &job_id, JobStatus::Completed).await;

    assert_eq!(job.progress.processed, 120);
    assert_eq!(job.progress.failed, 0);
    assert_eq!(job.progress.total, 120);
    assert!(job.completed_at.is_some());
    assert_eq!(provider.call_count(), 120);
    assert!(provider.requests().iter().all(|r| r.priority == 2));

    assert_eq!(store.count(ARTICLE, "fr").await.unwrap(), 120);
    assert_eq!(
        store.translation_of(ARTICLE, 7, "fr"),
        Some(Record::new(serde_json::json!({"title": "[fr] Article 7", "slug": "article-7"})))
    );

    let value = serde_json::to_value(&job).unwrap();
    assert_eq!(value["contentType"], ARTICLE);
    assert_eq!(value["status"], "completed");
    assert_eq!(value["progress"]["processed"], 120);
}

/// Test that a second job for the same key is rejected until the first ends
#[tokio::test]
async fn test_submitJob_withActiveJobForKey_shouldConflictUntilTerminal() {
    init_logging();
    let store = article_store(60);
    let (manager, provider) = gated_manager(store.clone());

    let first = manager.submit_job(params("fr")).await.unwrap();

    match manager.submit_job(params("fr")).await {
        Err(JobError::Conflict { job_id, target_locale, .. }) => {
            assert_eq!(job_id, first);
            assert_eq!(target_locale, "fr");
        }
        other => panic!("expected a conflict, got {:?}", other),
    }

    // another target locale is a different key
    let other = manager.submit_job(params("de")).await.unwrap();
    assert_ne!(first, other);

    provider.wait_until_reached().await;
    provider.open();
    wait_for_status(&manager, &first, JobStatus::Completed).await;
    wait_for_status(&manager, &other, JobStatus::Completed).await;

    let again = manager.submit_job(params("fr")).await.unwrap();
    let job = wait_for_status(&manager, &again, JobStatus::Completed).await;
    assert_eq!(job.progress.total, 0);
    assert_eq!(job.progress.processed, 0);
}

/// Test that malformed parameters are rejected before anything is stored
#[tokio::test]
async fn test_submitJob_withInvalidParameters_shouldFailValidation() {
    let store = article_store(3);
    let (manager, provider) = working_manager(store);

    let no_fields = SubmitJobParams::new(ARTICLE, "en", "fr", Vec::new());
    let bad_locale = SubmitJobParams::new(ARTICLE, "en", "not a locale", title_field());
    let unknown_type = SubmitJobParams::new("api::missing.missing", "en", "fr", title_field());
    let bad_path = SubmitJobParams::new(ARTICLE, "en", "fr", vec![TranslatableField::new("blocks[x]", TextFormat::Plain)]);

    for params in [no_fields, bad_locale, unknown_type, bad_path] {
        let result = manager.submit_job(params.clone()).await;
        assert!(
            matches!(result, Err(JobError::Validation(_))),
            "{:?} should be rejected, got {:?}",
            params,
            result
        );
    }

    assert!(manager.list_jobs(None).await.unwrap().is_empty());
    assert_eq!(provider.call_count(), 0);
}

/// Test pausing at a slice boundary and resuming to the same final result
#[tokio::test]
async fn test_pauseAndResume_shouldCompleteWithSameProgress() {
    init_logging();
    let store = article_store(200);
    let (manager, provider) = gated_manager(store.clone());

    let job_id = manager.submit_job(params("fr")).await.unwrap();

    let pausing = manager.clone();
    let id = job_id.clone();
    while_slice_in_flight(&provider, move || async move { pausing.pause_job(&id).await })
        .await
        .unwrap();

    let paused = manager.get_job(&job_id).await.unwrap();
    assert_eq!(paused.status, JobStatus::Paused);
    assert_eq!(paused.progress.processed, 50);
    assert_eq!(store.count(ARTICLE, "fr").await.unwrap(), 50);

    // pause is only valid while running
    assert!(matches!(
        manager.pause_job(&job_id).await,
        Err(JobError::InvalidState { status: JobStatus::Paused, .. })
    ));

    manager.resume_job(&job_id).await.unwrap();
    assert!(matches!(
        manager.resume_job(&job_id).await,
        Err(JobError::InvalidState { .. })
    ));

    let job = wait_for_status(&manager, &job_id, JobStatus::Completed).await;
    assert_eq!(job.progress.processed, 200);
    assert_eq!(job.progress.failed, 0);
    assert_eq!(job.progress.total, 200);
    assert_eq!(provider.translated(), 200);
}

/// Test that a pause waiting on one key leaves other keys free to operate
#[tokio::test]
async fn test_pauseJob_whileWaitingForSlice_shouldNotBlockOtherKeys() {
    init_logging();
    let store = article_store(100);
    let (manager, provider) = gated_manager(store.clone());

    let fr = manager.submit_job(params("fr")).await.unwrap();
    provider.wait_until_reached().await;

    let pausing = manager.clone();
    let id = fr.clone();
    let pause = tokio::spawn(async move { pausing.pause_job(&id).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let de = tokio::time::timeout(Duration::from_secs(2), manager.submit_job(params("de")))
        .await
        .expect("submit for another key must not wait for the pause")
        .unwrap();

    // a waiter that arrives while the task is parking sees the parked job
    let waiting = manager.clone();
    let id = fr.clone();
    let waiter = tokio::spawn(async move { waiting.wait_for_job(&id).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    provider.open();
    pause.await.unwrap().unwrap();
    let waited = waiter.await.unwrap().unwrap();
    assert_eq!(waited.status, JobStatus::Paused);
    assert_eq!(waited.progress.processed, 50);

    let job = wait_for_status(&manager, &de, JobStatus::Completed).await;
    assert_eq!(job.progress.processed, 100);
}

/// Test cancelling a running job and the operations that follow
#[tokio::test]
async fn test_cancelJob_whileRunning_shouldStopAtSliceBoundary() {
    init_logging();
    let store = article_store(200);
    let (manager, provider) = gated_manager(store.clone());

    let job_id = manager.submit_job(params("fr")).await.unwrap();

    let cancelling = manager.clone();
    let id = job_id.clone();
    while_slice_in_flight(&provider, move || async move { cancelling.cancel_job(&id).await })
        .await
        .unwrap();

    let job = manager.get_job(&job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.progress.processed, 50);
    assert!(job.completed_at.is_some());

    // cancelling twice is fine, everything else is not
    manager.cancel_job(&job_id).await.unwrap();
    assert!(matches!(
        manager.resume_job(&job_id).await,
        Err(JobError::InvalidState { status: JobStatus::Cancelled, operation: "resume", .. })
    ));
    assert!(matches!(
        manager.pause_job(&job_id).await,
        Err(JobError::InvalidState { status: JobStatus::Cancelled, .. })
    ));

    // the key is free again and translated records are not picked up twice
    let next = manager.submit_job(params("fr")).await.unwrap();
    let job = wait_for_status(&manager, &next, JobStatus::Completed).await;
    assert_eq!(job.progress.total, 150);
    assert_eq!(provider.translated(), 200);
}

/// Test cancelling a paused job without a live task
#[tokio::test]
async fn test_cancelJob_whilePaused_shouldCancelDirectly() {
    let store = article_store(200);
    let (manager, provider) = gated_manager(store);

    let job_id = manager.submit_job(params("fr")).await.unwrap();
    let pausing = manager.clone();
    let id = job_id.clone();
    while_slice_in_flight(&provider, move || async move { pausing.pause_job(&id).await })
        .await
        .unwrap();

    manager.cancel_job(&job_id).await.unwrap();

    let job = manager.get_job(&job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.progress.processed, 50);
}

/// Test that terminal jobs other than cancelled reject lifecycle operations
#[tokio::test]
async fn test_lifecycleOperations_onCompletedJob_shouldFailWithInvalidState() {
    let store = article_store(5);
    let (manager, _provider) = working_manager(store);

    let job_id = manager.submit_job(params("fr")).await.unwrap();
    wait_for_status(&manager, &job_id, JobStatus::Completed).await;

    for result in [
        manager.pause_job(&job_id).await,
        manager.resume_job(&job_id).await,
        manager.cancel_job(&job_id).await,
    ] {
        assert!(matches!(
            result,
            Err(JobError::InvalidState { status: JobStatus::Completed, .. })
        ));
    }

    assert!(matches!(
        manager.pause_job("00000000-0000-0000-0000-000000000000").await,
        Err(JobError::NotFound(_))
    ));
    assert!(matches!(manager.get_job("nope").await, Err(JobError::NotFound(_))));
}

/// Test that failing records are retried, counted and skipped
#[tokio::test]
async fn test_scheduler_withFailingRecord_shouldCountFailureAndComplete() {
    init_logging();
    let store = article_store(10);
    let provider = Arc::new(MockProvider::working().with_failing_marker("Article 7"));
    let repo = Repository::new_in_memory().unwrap();
    let manager = job_manager(repo, store.clone(), provider.clone());

    let job_id = manager.submit_job(params("fr")).await.unwrap();
    let job = wait_for_status(&manager, &job_id, JobStatus::Completed).await;

    assert_eq!(job.progress.processed, 9);
    assert_eq!(job.progress.failed, 1);
    assert_eq!(job.progress.total, 10);
    // three attempts for the failing record, one for every other
    assert_eq!(provider.call_count(), 12);
    assert_eq!(store.translation_of(ARTICLE, 7, "fr"), None);

    let failures = manager.repository().list_failures(&job_id).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].record_id, 7);
    assert_eq!(failures[0].attempts, 3);
    assert!(failures[0].error.contains("Simulated failure"));
}

/// Test that transient provider failures are absorbed by record retries
#[tokio::test]
async fn test_scheduler_withTransientFailures_shouldTranslateEverything() {
    let store = article_store(40);
    let provider = Arc::new(MockProvider::new(MockBehavior::FailFirst { failures: 5 }));
    let repo = Repository::new_in_memory().unwrap();
    let manager = job_manager(repo, store.clone(), provider.clone());

    let job_id = manager.submit_job(params("de")).await.unwrap();
    let job = wait_for_status(&manager, &job_id, JobStatus::Completed).await;

    assert_eq!(job.progress.processed, 40);
    assert_eq!(job.progress.failed, 0);
    // five first attempts failed, their retries succeeded
    assert_eq!(provider.call_count(), 45);
    assert_eq!(store.count(ARTICLE, "de").await.unwrap(), 40);
}

/// Test that a storage failure errors the job and records why
#[tokio::test]
async fn test_scheduler_withFailingStore_shouldMarkJobErrored() {
    init_logging();
    let store = Arc::new(FailingSaveStore::new(article_store(100), 10));
    let (manager, _provider) = working_manager(store);

    let job_id = manager.submit_job(params("fr")).await.unwrap();
    let job = wait_for_status(&manager, &job_id, JobStatus::Errored).await;

    assert!(job.error.as_deref().unwrap_or_default().contains("disk full"));
    assert_eq!(job.progress.processed, 0);

    // errored is terminal, so the key is released
    let next = manager.submit_job(params("fr")).await.unwrap();
    assert_ne!(next, job_id);
    wait_for_status(&manager, &next, JobStatus::Errored).await;
}

/// Test that records added after submission grow the total
#[tokio::test]
async fn test_scheduler_withRecordsAddedLater_shouldKeepProgressWithinTotal() {
    let store = article_store(60);
    let (manager, provider) = gated_manager(store.clone());

    let job_id = manager.submit_job(params("fr")).await.unwrap();
    assert_eq!(manager.get_job(&job_id).await.unwrap().progress.total, 60);

    provider.wait_until_reached().await;
    for i in 0..5 {
        store
            .insert(ARTICLE, "en", Record::new(serde_json::json!({"title": format!("Late {}", i)})))
            .unwrap();
    }
    provider.open();

    let job = wait_for_status(&manager, &job_id, JobStatus::Completed).await;
    assert_eq!(job.progress.processed, 65);
    assert!(job.progress.processed + job.progress.failed <= job.progress.total);
}

/// Test listing jobs, most recently updated first
#[tokio::test]
async fn test_listJobs_shouldFilterByContentTypeAndOrderByUpdate() {
    let store = article_store(3);
    let (manager, _provider) = working_manager(store);

    let first = manager.submit_job(params("fr")).await.unwrap();
    wait_for_status(&manager, &first, JobStatus::Completed).await;
    let second = manager.submit_job(params("de")).await.unwrap();
    wait_for_status(&manager, &second, JobStatus::Completed).await;

    let jobs = manager.list_jobs(Some(ARTICLE)).await.unwrap();
    let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);

    assert!(manager.list_jobs(Some("api::page.page")).await.unwrap().is_empty());

    let finished = wait_until(&manager, &first, |j| j.status.is_terminal()).await.unwrap();
    assert_eq!(finished.status, JobStatus::Completed);
}

/// Test that a zero slice size still walks through every record
#[tokio::test]
async fn test_scheduler_withZeroSliceSize_shouldStillTranslateEverything() {
    let store = article_store(5);
    let provider = Arc::new(MockProvider::working());
    let config = BatchConfig {
        slice_size: 0,
        ..test_batch_config()
    };
    let manager = BatchJobManager::new(
        Repository::new_in_memory().unwrap(),
        store.clone(),
        RecordTranslator::new(provider.clone()),
        config,
    );

    let job_id = manager.submit_job(params("fr")).await.unwrap();
    let job = wait_for_status(&manager, &job_id, JobStatus::Completed).await;

    assert_eq!(job.progress.processed, 5);
    assert_eq!(provider.call_count(), 5);
    assert!(store.is_fully_translated(ARTICLE, "fr").await.unwrap());
}
