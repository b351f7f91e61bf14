//! End-to-end tests for the contract intake workflow: upload gate,
//! job polling, review seeding, and confirmation.

mod common;

use std::time::Duration;

use driftai::api::local::JobStep;
use driftai::error::{DriftError, JobError, UploadRejection};
use driftai::intake::{IntakePhase, IntakeTarget, PollerState};
use driftai::review::NameCheckState;
use driftai::vendor::VendorRepository;

use common::{extracted, pdf_upload, WorkflowHarness};

#[tokio::test(start_paused = true)]
async fn test_create_vendor_from_contract_end_to_end() {
    let harness = WorkflowHarness::new();
    harness.stage_completion(extracted("Acme Co", "2024-01-01"));

    let form = harness
        .workflow
        .begin(
            IntakeTarget::CreateVendor,
            pdf_upload("acme-contract.pdf", 2 * 1024 * 1024),
        )
        .await
        .unwrap();

    // Two processing polls, then the completed one.
    assert_eq!(harness.service.poll_calls(), 3);
    assert_eq!(form.fields().primary_vendor_name, "Acme Co");
    assert_eq!(form.fields().effective_date.as_deref(), Some("2024-01-01"));

    form.settle_name_check().await;
    assert_eq!(form.name_check(), NameCheckState::Unique);

    let created = form.confirm().await.unwrap();
    assert!(!created.vendor_id.is_empty());
    assert!(!created.contract_id.is_empty());

    let vendor = harness
        .service
        .vendors()
        .get_by_id(&created.vendor_id)
        .await
        .unwrap();
    assert_eq!(vendor.name, "Acme Co");
    assert_eq!(vendor.contract_id, Some(created.contract_id));
}

#[tokio::test(start_paused = true)]
async fn test_oversized_file_never_reaches_network() {
    let harness = WorkflowHarness::new();

    let result = harness
        .workflow
        .begin(
            IntakeTarget::CreateVendor,
            pdf_upload("huge.pdf", 11 * 1024 * 1024),
        )
        .await;

    assert!(matches!(
        result,
        Err(DriftError::Upload(UploadRejection::TooLarge { .. }))
    ));
    assert_eq!(harness.service.upload_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_and_unsupported_files_rejected_locally() {
    let harness = WorkflowHarness::new();

    let result = harness
        .workflow
        .begin(IntakeTarget::CreateVendor, pdf_upload("empty.pdf", 0))
        .await;
    assert!(matches!(
        result,
        Err(DriftError::Upload(UploadRejection::EmptySelection))
    ));

    let result = harness
        .workflow
        .begin(IntakeTarget::CreateVendor, pdf_upload("notes.txt", 64))
        .await;
    assert!(matches!(
        result,
        Err(DriftError::Upload(UploadRejection::UnsupportedType { .. }))
    ));

    assert_eq!(harness.service.upload_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_server_reported_failure_is_surfaced_verbatim() {
    let harness = WorkflowHarness::new();
    harness.service.stage_job(vec![
        JobStep::Processing,
        JobStep::Failed("unreadable scan".to_string()),
    ]);

    let result = harness
        .workflow
        .begin(IntakeTarget::CreateVendor, pdf_upload("blurry.pdf", 1024))
        .await;

    match result {
        Err(DriftError::Job(JobError::Failed(message))) => {
            assert_eq!(message, "unreadable scan")
        }
        other => panic!("expected job failure, got {:?}", other.map(|_| ())),
    }
    assert!(matches!(
        harness.workflow.poller().state(),
        PollerState::Failed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_stuck_job_times_out_and_next_upload_recovers() {
    let harness = WorkflowHarness::new();
    harness.service.stage_job(vec![JobStep::Pending]);

    let result = harness
        .workflow
        .begin(IntakeTarget::CreateVendor, pdf_upload("stuck.pdf", 1024))
        .await;
    assert!(matches!(
        result,
        Err(DriftError::Job(JobError::TimedOut { ceiling_secs: 60 }))
    ));
    assert_eq!(harness.workflow.poller().state(), PollerState::TimedOut);

    // Polling stops for good once the ceiling is reached.
    let polls = harness.service.poll_calls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.service.poll_calls(), polls);

    // A fresh upload starts a new job and reaches review.
    harness.stage_completion(extracted("Retry Co", "2024-03-01"));
    let form = harness
        .workflow
        .begin(IntakeTarget::CreateVendor, pdf_upload("retry.pdf", 1024))
        .await
        .unwrap();
    assert_eq!(form.fields().primary_vendor_name, "Retry Co");
    assert!(matches!(
        harness.workflow.poller().state(),
        PollerState::Completed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_abandon_stops_polling_and_discards_responses() {
    let harness = WorkflowHarness::new();
    harness.service.stage_job(vec![JobStep::Pending]);

    let workflow = harness.workflow.clone();
    let task = tokio::spawn(async move {
        workflow
            .begin(IntakeTarget::CreateVendor, pdf_upload("slow.pdf", 1024))
            .await
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    harness.workflow.abandon();

    let result = task.await.unwrap();
    assert!(matches!(
        result,
        Err(DriftError::Job(JobError::Abandoned))
    ));
    assert_eq!(harness.workflow.poller().state(), PollerState::Idle);

    let polls = harness.service.poll_calls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.service.poll_calls(), polls);
}

#[tokio::test(start_paused = true)]
async fn test_progress_events_are_monotonic_until_completion() {
    let harness = WorkflowHarness::new();
    let mut events = harness.workflow.subscribe();
    harness.stage_completion(extracted("Acme Co", "2024-01-01"));

    harness
        .workflow
        .begin(IntakeTarget::CreateVendor, pdf_upload("acme.pdf", 1024))
        .await
        .unwrap();

    let mut last_progress = -1.0;
    let mut saw_completed = false;
    while let Ok(event) = events.try_recv() {
        assert!(
            event.progress >= last_progress,
            "progress regressed at {:?}",
            event.phase
        );
        last_progress = event.progress;
        if event.phase == IntakePhase::Completed {
            saw_completed = true;
            assert_eq!(event.progress, 100.0);
        }
    }
    assert!(saw_completed);
}

#[tokio::test(start_paused = true)]
async fn test_replace_contract_threads_new_contract_id() {
    let harness = WorkflowHarness::new();
    let vendor_id = harness.seed_vendor("Acme Co").await;
    let original = harness
        .service
        .vendors()
        .get_by_id(&vendor_id)
        .await
        .unwrap();

    harness.stage_completion(extracted("Acme Co", "2025-01-01"));
    let form = harness
        .workflow
        .begin(
            IntakeTarget::ReplaceContract {
                vendor_id: vendor_id.clone(),
            },
            pdf_upload("renewal.pdf", 1024),
        )
        .await
        .unwrap();

    // The extracted name matches the vendor being replaced; that is
    // not a conflict.
    form.settle_name_check().await;
    let replaced = form.confirm().await.unwrap();

    assert_eq!(replaced.vendor_id, vendor_id);
    assert_ne!(Some(replaced.contract_id.clone()), original.contract_id);

    let updated = harness
        .service
        .vendors()
        .get_by_id(&vendor_id)
        .await
        .unwrap();
    assert_eq!(updated.contract_id, Some(replaced.contract_id));
    assert_eq!(updated.effective_date.as_deref(), Some("2025-01-01"));
}

#[tokio::test(start_paused = true)]
async fn test_replace_contract_unknown_vendor_fails_at_upload() {
    let harness = WorkflowHarness::new();

    let result = harness
        .workflow
        .begin(
            IntakeTarget::ReplaceContract {
                vendor_id: "ghost".to_string(),
            },
            pdf_upload("renewal.pdf", 1024),
        )
        .await;

    assert!(matches!(result, Err(DriftError::Transport(_))));
    assert!(matches!(
        harness.workflow.poller().state(),
        PollerState::Failed { .. }
    ));
}
