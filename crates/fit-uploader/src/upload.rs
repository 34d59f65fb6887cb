// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Upload state machine for a single file.
//!
//! ```text
//! Submitting ─┬─> DuplicateAccepted                      (success)
//!             ├─> Errored                                (failure)
//!             ├─> Untracked ─┬─> AcceptedUntracked       (success)
//!             │              └─> Errored                 (failure)
//!             └─> AwaitingProcessing ──> Processing ─┬─> Ready                     (success)
//!                                                    ├─> DuplicateAccepted         (success)
//!                                                    ├─> Errored                   (failure)
//!                                                    └─> TimedOutAcceptedAsSuccess (success)
//! ```
//!
//! The submission call is fire-and-forget: the remote processes the file
//! asynchronously and the result has to be polled. The status endpoint is
//! known to return empty bodies while processing, so empty or failed polls
//! never count as failure on their own. Once either the consecutive-empty
//! threshold or the poll budget is reached, the upload is assumed accepted
//! rather than re-submitted. A refused poll (rate limited or unauthorized)
//! ends the attempt, since further polls cannot succeed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::classify::{self, UntrackedVerdict};
use crate::config::UploaderConfig;
use crate::error::{Result, UploadError};
use crate::gateway::UploadGateway;
use crate::rate_limit::RateLimitTracker;
use crate::reporter::{ProgressReporter, UploadEvent};
use crate::types::{
    AssumedReason, RemoteUploadHandle, Submission, UploadOutcome, UploadPhase,
};

/// Bounds of the status polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each poll.
    pub interval: Duration,
    /// Maximum number of polls.
    pub max_polls: u32,
    /// Consecutive empty or failed polls treated as silent acceptance.
    pub empty_response_threshold: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&UploaderConfig::default())
    }
}

impl From<&UploaderConfig> for PollPolicy {
    fn from(config: &UploaderConfig) -> Self {
        Self {
            interval: config.poll_interval,
            max_polls: config.max_polls,
            empty_response_threshold: config.empty_response_threshold,
        }
    }
}

/// State reached right after the submission call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    /// Error phase whose text flags a duplicate.
    DuplicateAccepted(String),
    /// Error phase for any other reason.
    Errored(String),
    /// Tracked; processing must be polled.
    AwaitingProcessing(u64),
    /// No tracking id was assigned.
    Untracked(UntrackedVerdict),
}

/// Classify the handle returned by the submission call.
pub fn classify_submission(handle: &RemoteUploadHandle) -> SubmissionState {
    if handle.phase() == UploadPhase::Error {
        let message = error_message(handle, "Upload error (no details provided)");
        return if classify::is_duplicate(&message) {
            SubmissionState::DuplicateAccepted(message)
        } else {
            SubmissionState::Errored(message)
        };
    }
    if handle.is_tracked() {
        SubmissionState::AwaitingProcessing(handle.submission_id)
    } else {
        SubmissionState::Untracked(classify::classify_untracked(
            handle.raw_status.as_deref(),
            handle.resulting_activity_id,
        ))
    }
}

fn error_message(handle: &RemoteUploadHandle, fallback: &str) -> String {
    handle
        .error_text
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Drives one submission to a terminal outcome.
pub struct UploadStateMachine {
    gateway: Arc<dyn UploadGateway>,
    reporter: Arc<dyn ProgressReporter>,
    policy: PollPolicy,
}

impl UploadStateMachine {
    /// Create a state machine over `gateway`.
    pub fn new(
        gateway: Arc<dyn UploadGateway>,
        reporter: Arc<dyn ProgressReporter>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            gateway,
            reporter,
            policy,
        }
    }

    /// Polling bounds in use.
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Submit the file and follow it to a terminal state.
    ///
    /// `Ok` covers every success-mapped terminal state; any `Err` is an
    /// attempt-level failure for the retry controller to handle.
    pub async fn run(
        &self,
        submission: &Submission,
        tracker: &mut RateLimitTracker,
    ) -> Result<UploadOutcome> {
        self.reporter.report(&UploadEvent::Submitting {
            file: submission.file_identifier.clone(),
            activity_type: submission.activity_type,
        });

        let observed = match self.gateway.submit(submission).await {
            Ok(observed) => observed,
            Err(e) => {
                tracker.observe(e.rate_limit());
                return Err(e);
            }
        };
        tracker.observe(observed.rate_limit.as_ref());
        let handle = observed.value;

        self.reporter.report(&UploadEvent::Submitted {
            upload_id: handle.submission_id,
            status: handle.status_display().to_string(),
            phase: handle.phase(),
        });

        match classify_submission(&handle) {
            SubmissionState::DuplicateAccepted(message) => {
                info!(file = %submission.file_identifier, %message, "Duplicate detected, treating as success");
                self.reporter.report(&UploadEvent::DuplicateDetected {
                    message: message.clone(),
                });
                Ok(UploadOutcome::Duplicate { message })
            }
            SubmissionState::Errored(message) => {
                warn!(file = %submission.file_identifier, %message, "Upload rejected");
                Err(UploadError::Rejected(message))
            }
            SubmissionState::Untracked(UntrackedVerdict::Confirmed(activity_id)) => {
                info!(activity_id, "Upload ready without tracking id");
                Ok(UploadOutcome::AcceptedUntracked { activity_id })
            }
            SubmissionState::Untracked(UntrackedVerdict::KnownUnconfirmed) => {
                warn!(status = handle.status_display(), "Upload id not assigned, cannot monitor");
                Err(UploadError::Untracked(format!(
                    "upload id not assigned - status: {}",
                    handle.status_display()
                )))
            }
            SubmissionState::Untracked(UntrackedVerdict::Ambiguous) => {
                warn!(status = ?handle.raw_status, "Upload id is 0 and status is ambiguous");
                Err(UploadError::Untracked(format!(
                    "upload id is 0 with unknown status: {}",
                    handle.raw_status.as_deref().unwrap_or("")
                )))
            }
            SubmissionState::AwaitingProcessing(upload_id) => {
                self.await_processing(upload_id, tracker).await
            }
        }
    }

    /// Poll until the remote reports a terminal phase or a bound is reached.
    async fn await_processing(
        &self,
        upload_id: u64,
        tracker: &mut RateLimitTracker,
    ) -> Result<UploadOutcome> {
        debug!(upload_id, "Monitoring upload status");
        let mut consecutive_empty = 0u32;

        for check in 1..=self.policy.max_polls {
            tokio::time::sleep(self.policy.interval).await;

            let handle = match self.gateway.poll_status(upload_id).await {
                Ok(observed) => {
                    tracker.observe(observed.rate_limit.as_ref());
                    observed.value
                }
                Err(e) => {
                    tracker.observe(e.rate_limit());
                    if e.is_fatal() {
                        warn!(upload_id, check, error = %e, "Status check refused, giving up on this attempt");
                        return Err(e);
                    }
                    warn!(upload_id, check, error = %e, "Status check failed");
                    None
                }
            };

            let Some(handle) = handle else {
                consecutive_empty += 1;
                self.reporter.report(&UploadEvent::Polled {
                    check,
                    phase: None,
                    status: None,
                });
                if consecutive_empty >= self.policy.empty_response_threshold {
                    return Ok(self.assume_accepted(
                        upload_id,
                        AssumedReason::EmptyResponses(consecutive_empty),
                    ));
                }
                continue;
            };
            consecutive_empty = 0;

            let phase = handle.phase();
            self.reporter.report(&UploadEvent::Polled {
                check,
                phase: Some(phase),
                status: handle.raw_status.clone(),
            });

            match phase {
                UploadPhase::Ready => return Ok(ready(upload_id, &handle)),
                UploadPhase::Error => {
                    let message = error_message(&handle, "Unknown error occurred");
                    if classify::is_duplicate(&message) {
                        info!(upload_id, %message, "Duplicate detected while processing");
                        self.reporter.report(&UploadEvent::DuplicateDetected {
                            message: message.clone(),
                        });
                        return Ok(UploadOutcome::Duplicate { message });
                    }
                    warn!(upload_id, %message, "Processing error");
                    return Err(UploadError::Processing(message));
                }
                UploadPhase::Processing => continue,
                UploadPhase::Unknown => {
                    if let Some(status) = handle.raw_status.as_deref() {
                        if classify::mentions_ready(status) {
                            return Ok(ready(upload_id, &handle));
                        }
                        if classify::mentions_error(status) {
                            return Err(UploadError::Processing(format!(
                                "upload failed with status: {}",
                                status
                            )));
                        }
                    }
                }
            }
        }

        Ok(self.assume_accepted(upload_id, AssumedReason::PollTimeout(self.policy.max_polls)))
    }

    fn assume_accepted(&self, upload_id: u64, reason: AssumedReason) -> UploadOutcome {
        let detail = match reason {
            AssumedReason::EmptyResponses(n) => {
                format!("no status updates after {} consecutive empty responses", n)
            }
            AssumedReason::PollTimeout(n) => {
                let waited = self.policy.interval * n;
                format!("status check timeout after {} polls ({:?})", n, waited)
            }
        };
        warn!(upload_id, %detail, "Upload accepted but unconfirmed, treating as success");
        self.reporter
            .report(&UploadEvent::AssumedAccepted { upload_id, detail });
        UploadOutcome::AssumedAccepted { upload_id, reason }
    }
}

fn ready(upload_id: u64, handle: &RemoteUploadHandle) -> UploadOutcome {
    info!(upload_id, activity_id = ?handle.resulting_activity_id, "Upload complete");
    UploadOutcome::Ready {
        upload_id,
        activity_id: handle.resulting_activity_id,
    }
}
