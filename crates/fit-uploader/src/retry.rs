// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bounded retry around the upload state machine.
//!
//! Every failure from the state machine (transport errors, rejected or
//! untracked submissions, processing errors) is retried after a fixed delay
//! until the attempt budget runs out. Success-mapped outcomes return at once.
//! Retrying stops early once the remote is rate limited or rejects the
//! credential, because every further attempt would be refused too.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::config::UploaderConfig;
use crate::error::{Result, UploadError};
use crate::rate_limit::RateLimitTracker;
use crate::reporter::{ProgressReporter, UploadEvent};
use crate::types::{Submission, UploadOutcome};
use crate::upload::UploadStateMachine;

/// Attempt budget and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per file, including the first.
    pub max_attempts: u32,
    /// Fixed delay before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&UploaderConfig::default())
    }
}

impl From<&UploaderConfig> for RetryPolicy {
    fn from(config: &UploaderConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.retry_delay,
        }
    }
}

/// Runs the state machine up to `max_attempts` times.
pub struct RetryController {
    machine: UploadStateMachine,
    reporter: Arc<dyn ProgressReporter>,
    policy: RetryPolicy,
}

impl RetryController {
    /// Wrap `machine` with the given policy.
    pub fn new(
        machine: UploadStateMachine,
        reporter: Arc<dyn ProgressReporter>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            machine,
            reporter,
            policy,
        }
    }

    /// Retry bounds in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver `submission`, retrying failures.
    ///
    /// Returns [`UploadError::RetriesExhausted`] carrying the last failure
    /// once every attempt has failed. A fatal failure, or one that leaves the
    /// rate limit exhausted, is returned as is without further attempts.
    pub async fn attempt(
        &self,
        submission: &Submission,
        tracker: &mut RateLimitTracker,
    ) -> Result<UploadOutcome> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                self.reporter.report(&UploadEvent::RetryScheduled {
                    attempt,
                    max_attempts,
                    delay: self.policy.delay,
                });
                tokio::time::sleep(self.policy.delay).await;
            }

            match self.machine.run(submission, tracker).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    warn!(
                        file = %submission.file_identifier,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Upload attempt failed"
                    );
                    self.reporter.report(&UploadEvent::AttemptFailed {
                        attempt,
                        max_attempts,
                        error: e.to_string(),
                    });
                    if e.is_fatal() || tracker.is_exceeded() {
                        error!(
                            file = %submission.file_identifier,
                            attempt,
                            status = %tracker.status(),
                            "Remote refuses further work, not retrying"
                        );
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        error!(file = %submission.file_identifier, "All retry attempts exhausted");
        Err(UploadError::RetriesExhausted {
            attempts: max_attempts,
            last_error: Box::new(last_error.unwrap_or_else(|| {
                UploadError::Config("no upload attempt was made".to_string())
            })),
        })
    }
}
