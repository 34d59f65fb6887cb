// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for bounded retries.
//!
//! These tests run on a paused clock, so the fixed retry delay is observed
//! without actually waiting.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordingReporter, ScriptedGateway, errored, processing, usage};
use fit_uploader::{
    Observed, PollPolicy, RateLimitTracker, RetryController, RetryPolicy, Submission, UploadError,
    UploadEvent, UploadOutcome, UploadStateMachine,
};
use tokio::time::Instant;

fn controller(
    gateway: &Arc<ScriptedGateway>,
    reporter: &Arc<RecordingReporter>,
    max_attempts: u32,
) -> RetryController {
    let machine = UploadStateMachine::new(
        gateway.clone(),
        reporter.clone(),
        PollPolicy {
            interval: Duration::from_millis(10),
            max_polls: 3,
            empty_response_threshold: 5,
        },
    );
    RetryController::new(
        machine,
        reporter.clone(),
        RetryPolicy {
            max_attempts,
            delay: Duration::from_secs(5),
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_persistent_failure_uses_exactly_max_attempts() {
    // No scripted submits: every attempt hits a transport error.
    let gateway = Arc::new(ScriptedGateway::new());
    let reporter = Arc::new(RecordingReporter::new());
    let mut tracker = RateLimitTracker::new();
    let submission = Submission::for_path("broken.fit", None);

    let started = Instant::now();
    let err = controller(&gateway, &reporter, 3)
        .attempt(&submission, &mut tracker)
        .await
        .unwrap_err();

    assert_eq!(gateway.submit_calls(), 3);
    match err {
        UploadError::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last_error, UploadError::Http(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    // Two delays between three attempts.
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert!(started.elapsed() < Duration::from_secs(15));
    assert_eq!(
        reporter.count(|e| matches!(e, UploadEvent::AttemptFailed { .. })),
        3
    );
    assert_eq!(
        reporter.count(|e| matches!(e, UploadEvent::RetryScheduled { .. })),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn test_success_on_second_attempt() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .on_submit(Err(UploadError::Http("timed out".into())))
            .accepts_and_completes(15, 150),
    );
    let reporter = Arc::new(RecordingReporter::new());
    let mut tracker = RateLimitTracker::new();
    let submission = Submission::for_path("retry_me.fit", None);

    let outcome = controller(&gateway, &reporter, 3)
        .attempt(&submission, &mut tracker)
        .await
        .unwrap();

    assert_eq!(outcome.activity_id(), Some(150));
    assert_eq!(gateway.submit_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_processing_error_is_retried() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .on_submit(Ok(Observed::bare(processing(1))))
            .on_poll(Ok(Observed::bare(Some(errored(1, "temporary failure")))))
            .accepts_and_completes(2, 20),
    );
    let reporter = Arc::new(RecordingReporter::new());
    let mut tracker = RateLimitTracker::new();
    let submission = Submission::for_path("flaky.fit", None);

    let outcome = controller(&gateway, &reporter, 3)
        .attempt(&submission, &mut tracker)
        .await
        .unwrap();

    assert!(matches!(outcome, UploadOutcome::Ready { upload_id: 2, .. }));
    assert_eq!(gateway.submit_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy_does_not_wait() {
    let gateway = Arc::new(ScriptedGateway::new());
    let reporter = Arc::new(RecordingReporter::new());
    let mut tracker = RateLimitTracker::new();
    let submission = Submission::for_path("once.fit", None);

    let started = Instant::now();
    let err = controller(&gateway, &reporter, 1)
        .attempt(&submission, &mut tracker)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::RetriesExhausted { attempts: 1, .. }));
    assert_eq!(gateway.submit_calls(), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_attempt_is_not_retried() {
    let gateway = Arc::new(ScriptedGateway::new().on_submit(Err(UploadError::RateLimited {
        status: "15-min: 600/600 | Daily: 900/30000".to_string(),
        rate_limit: usage(600, 900),
    })));
    let reporter = Arc::new(RecordingReporter::new());
    let mut tracker = RateLimitTracker::new();
    let submission = Submission::for_path("limited.fit", None);

    let started = Instant::now();
    let err = controller(&gateway, &reporter, 3)
        .attempt(&submission, &mut tracker)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::RateLimited { .. }));
    assert!(err.is_fatal());
    assert!(tracker.is_exceeded());
    assert_eq!(gateway.submit_calls(), 1);
    assert_eq!(
        reporter.count(|e| matches!(e, UploadEvent::RetryScheduled { .. })),
        0
    );
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_usage_on_transient_error_stops_retries() {
    let gateway = Arc::new(ScriptedGateway::new().on_submit(Err(UploadError::Api {
        status: 502,
        message: "bad gateway".to_string(),
        rate_limit: usage(100, 30000),
    })));
    let reporter = Arc::new(RecordingReporter::new());
    let mut tracker = RateLimitTracker::new();
    let submission = Submission::for_path("daily.fit", None);

    let err = controller(&gateway, &reporter, 3)
        .attempt(&submission, &mut tracker)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Api { status: 502, .. }));
    assert!(!err.is_fatal());
    assert_eq!(gateway.submit_calls(), 1);
}
