//! Queue-level behavior through the service facade: submission modes,
//! status projection, history.

mod common;

use common::{ItemSpec, ScenarioBuilder, TestHarness};
use transcriptor::error::{QueueError, TranscriptorError};
use transcriptor::processor::read_docx_text;
use transcriptor::worker::{JobId, JobState};

#[tokio::test]
async fn test_sync_submission_returns_artifact() {
    let harness = TestHarness::new();
    let archive = harness.write_archive("shift.zip", &ScenarioBuilder::with_items(2));
    let service = harness.service();

    let result = service.transcribe_and_wait(&archive).await.unwrap();

    assert_eq!(result.message, "Scenario fully transcribed");
    assert!(result.artifact.starts_with("/uploads/jobs/shift-"));
    assert!(result.artifact.ends_with("/shift.docx"));
    let job_dir = result.artifact.split('/').nth(3).unwrap();
    let stamp = job_dir.strip_prefix("shift-").unwrap();
    assert!(stamp.chars().all(|c| c.is_ascii_digit()), "{}", job_dir);

    let path = service
        .resolve_artifact(&result.artifact)
        .await
        .expect("artifact on disk");
    let text = read_docx_text(&path).unwrap();
    assert!(text.contains("Item: Item1"));
    assert!(text.contains("Item: Item2"));

    // The caller's archive is untouched; only the staged copy is consumed.
    assert!(archive.exists());
}

#[tokio::test]
async fn test_async_submission_and_status() {
    let harness = TestHarness::new();
    let archive = harness.write_archive("shift.zip", &ScenarioBuilder::with_items(3));
    let service = harness.service();

    let id = service.submit_archive(&archive).await.unwrap();
    let job = service.queue().wait_for(&id).await.unwrap();
    assert_eq!(job.state, JobState::Finished);

    let status = service.status(&id).unwrap();
    assert_eq!(status.state, JobState::Finished);
    assert_eq!(status.progress, 100);
    assert_eq!(status.items_done, 3);
    assert_eq!(status.total_items, 3);
    assert!(status.error.is_none());
    assert!(status.result.is_some());

    let json = serde_json::to_value(&status).unwrap();
    assert!(json["error"].is_null());
    assert_eq!(json["itemsDone"], 3);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let harness = TestHarness::new();
    let service = harness.service();

    let err = service.status(&JobId::from("does-not-exist")).unwrap_err();
    assert_eq!(err, QueueError::NotFound("does-not-exist".to_string()));
}

#[tokio::test]
async fn test_failed_job_surfaces_error() {
    let harness = TestHarness::new();
    let builder = ScenarioBuilder::with_items(1).without_index();
    let archive = harness.write_archive("broken.zip", &builder);
    let service = harness.service();

    let id = service.submit_archive(&archive).await.unwrap();
    let job = service.queue().wait_for(&id).await.unwrap();

    let status = service.status(&id).unwrap();
    assert_eq!(status.state, JobState::Failed);
    assert!(status.result.is_none());
    let error = status.error.expect("failed job has an error");
    assert!(error.starts_with("Item index not found"));
    assert!(error.contains("RecordedItems.xml"));
    assert!(job.progress < 100);

    let sync = service.transcribe_and_wait(&archive).await;
    match sync {
        Err(TranscriptorError::Queue(QueueError::JobFailed { error, .. })) => {
            assert!(error.starts_with("Item index not found"))
        }
        other => panic!("expected JobFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_jobs_run_one_at_a_time_in_order() {
    let harness = TestHarness::new();
    let first_archive = harness.write_archive("first.zip", &ScenarioBuilder::with_items(2));
    let second_archive = harness.write_archive(
        "second.zip",
        &ScenarioBuilder::with_items(1).item(ItemSpec::missing_audio(2)),
    );
    let service = harness.service();
    let mut events = service.queue().subscribe();

    let first = service.submit_archive(&first_archive).await.unwrap();
    let second = service.submit_archive(&second_archive).await.unwrap();
    service.queue().wait_for(&second).await.unwrap();

    let mut order = Vec::new();
    while let Ok(event) = events.try_recv() {
        order.push(event);
    }

    let first_done = order
        .iter()
        .position(|e| e.job_id == first.as_str() && e.state == JobState::Finished)
        .expect("first job finished");
    let second_started = order
        .iter()
        .position(|e| e.job_id == second.as_str() && e.state == JobState::Processing)
        .expect("second job started");
    assert!(first_done < second_started);

    for id in [&first, &second] {
        let values: Vec<u8> = order
            .iter()
            .filter(|e| e.job_id == id.as_str())
            .map(|e| e.progress)
            .collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{:?}", values);
        assert_eq!(values.last(), Some(&100));
    }
}

#[tokio::test]
async fn test_history_lists_reports_newest_first() {
    let harness = TestHarness::new();
    let service = harness.service();

    let older = harness.write_archive("older.zip", &ScenarioBuilder::with_items(1));
    service.transcribe_and_wait(&older).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let newer = harness.write_archive("newer.zip", &ScenarioBuilder::with_items(1));
    service.transcribe_and_wait(&newer).await.unwrap();

    let history = service.history(None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].file, "newer.docx");
    assert_eq!(history[1].file, "older.docx");
    assert!(history[0].url.starts_with("/uploads/jobs/newer-"));

    assert_eq!(service.history(Some(1)).await.unwrap().len(), 1);
    assert_eq!(harness.job_dirs().len(), 2);
}
