// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Batch orchestration over a directory of activity files.
//!
//! Files are handled strictly one at a time. The remote rate budget is shared
//! by every request made with the credential, so running uploads concurrently
//! would only exhaust it sooner.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::UploaderConfig;
use crate::error::{Result, UploadError};
use crate::gateway::UploadGateway;
use crate::ledger::UploadLedger;
use crate::rate_limit::RateLimitTracker;
use crate::reporter::{ProgressReporter, UploadEvent};
use crate::retry::{RetryController, RetryPolicy};
use crate::scan;
use crate::types::{AthleteSummary, ProbeOutcome, RunSummary, Submission, file_identifier};
use crate::upload::{PollPolicy, UploadStateMachine};

/// Drives a whole run: credential check, discovery, per-file delivery, tally.
pub struct BatchOrchestrator {
    config: UploaderConfig,
    gateway: Arc<dyn UploadGateway>,
    reporter: Arc<dyn ProgressReporter>,
    retry: RetryController,
    ledger: UploadLedger,
    tracker: RateLimitTracker,
}

impl BatchOrchestrator {
    /// Create an orchestrator. The ledger is owned for the duration of the run.
    pub fn new(
        config: UploaderConfig,
        gateway: Arc<dyn UploadGateway>,
        ledger: UploadLedger,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        let machine = UploadStateMachine::new(
            gateway.clone(),
            reporter.clone(),
            PollPolicy::from(&config),
        );
        let retry = RetryController::new(machine, reporter.clone(), RetryPolicy::from(&config));
        Self {
            config,
            gateway,
            reporter,
            retry,
            ledger,
            tracker: RateLimitTracker::new(),
        }
    }

    /// Idempotency ledger.
    pub fn ledger(&self) -> &UploadLedger {
        &self.ledger
    }

    /// Latest rate-limit observation.
    pub fn tracker(&self) -> &RateLimitTracker {
        &self.tracker
    }

    /// Consume the orchestrator, returning the ledger.
    pub fn into_ledger(self) -> UploadLedger {
        self.ledger
    }

    /// Full run: validate the credential, scan the resources directory, and
    /// upload every file.
    ///
    /// Errors are fatal conditions only; individual file failures are part of
    /// the returned summary.
    pub async fn run(&mut self) -> Result<RunSummary> {
        self.validate_credentials().await?;
        let files = scan::discover_files(&self.config.resources_dir, &self.config.file_extension)?;
        info!(
            dir = %self.config.resources_dir.display(),
            count = files.len(),
            "Discovered activity files"
        );
        Ok(self.process_files(&files).await)
    }

    /// Probe the remote once with the credential.
    ///
    /// Unauthorized, rate-limited and any other non-success answer are fatal,
    /// as is an exhausted rate budget reported on a successful probe.
    pub async fn validate_credentials(&mut self) -> Result<AthleteSummary> {
        let observed = self.gateway.probe().await?;
        self.tracker.observe(observed.rate_limit.as_ref());

        match observed.value {
            ProbeOutcome::Authenticated(athlete) => {
                if self.tracker.is_exceeded() {
                    error!(status = %self.tracker.status(), "Rate limit exhausted before start");
                    return Err(UploadError::RateLimited {
                        status: self.tracker.status(),
                        rate_limit: observed.rate_limit,
                    });
                }
                info!(athlete = %athlete.display_name(), "Access token validated");
                self.reporter.report(&UploadEvent::Authenticated {
                    athlete: athlete.display_name(),
                    rate_limit: self.tracker.status(),
                });
                Ok(athlete)
            }
            ProbeOutcome::Unauthorized => Err(UploadError::Unauthorized),
            ProbeOutcome::RateLimited => Err(UploadError::RateLimited {
                status: self.tracker.status(),
                rate_limit: observed.rate_limit,
            }),
            ProbeOutcome::Failed { status, body } => Err(UploadError::Api {
                status,
                message: body,
                rate_limit: observed.rate_limit,
            }),
        }
    }

    /// Upload `files` in order and tally the results.
    ///
    /// A file's ordinary failure never stops the batch. An exhausted rate
    /// limit, or a fatal error such as a 429 or a revoked credential, stops
    /// further remote attempts; files still pending are counted as not
    /// attempted.
    pub async fn process_files(&mut self, files: &[PathBuf]) -> RunSummary {
        let total = files.len();
        let mut summary = RunSummary {
            discovered: total,
            ..RunSummary::default()
        };
        self.reporter.report(&UploadEvent::BatchStarted { total });

        for (i, path) in files.iter().enumerate() {
            let submission = Submission::for_path(path, self.config.activity_type);
            let file = submission.file_identifier.clone();

            self.reporter.report(&UploadEvent::FileStarted {
                index: i + 1,
                total,
                file: file.clone(),
            });

            if self.ledger.contains(&file) {
                info!(%file, "Skipped, already uploaded");
                self.reporter.report(&UploadEvent::Skipped { file });
                summary.skipped += 1;
                continue;
            }

            if !summary.halted && self.tracker.is_exceeded() {
                self.halt(&mut summary, &files[i..], None);
            }
            if summary.halted {
                summary.not_attempted += 1;
                continue;
            }

            match self.retry.attempt(&submission, &mut self.tracker).await {
                Ok(outcome) => {
                    summary.succeeded += 1;
                    if let Err(e) = self.ledger.add(&file) {
                        error!(%file, error = %e, "Uploaded but could not record in ledger; the file may be uploaded again next run");
                        self.reporter.report(&UploadEvent::LedgerWriteFailed {
                            file: file.clone(),
                            error: e.to_string(),
                        });
                        summary.ledger_write_failures += 1;
                    }
                    info!(%file, ?outcome, "Upload succeeded");
                    self.reporter
                        .report(&UploadEvent::FileSucceeded { file, outcome });
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(%file, error = %e, "Upload failed");
                    self.reporter.report(&UploadEvent::FileFailed {
                        file,
                        error: e.to_string(),
                    });
                    if e.is_fatal() {
                        self.halt(&mut summary, &files[i + 1..], Some(&e));
                    }
                }
            }

            if (i + 1) % self.config.rate_check_interval.max(1) == 0
                && self.tracker.is_near_limit()
            {
                let detail = self
                    .tracker
                    .warning()
                    .unwrap_or_else(|| self.tracker.status());
                warn!(status = %self.tracker.status(), "Approaching rate limit");
                self.reporter
                    .report(&UploadEvent::RateLimitWarning { detail });
            }
        }

        summary.total_delivered = self.ledger.count();
        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            not_attempted = summary.not_attempted,
            total_delivered = summary.total_delivered,
            "Batch finished"
        );
        summary
    }

    /// Stop remote work for the rest of the batch and report why.
    ///
    /// `pending` are the files not yet handled; ledgered ones among them are
    /// still skipped, so only the others count as remaining.
    fn halt(&self, summary: &mut RunSummary, pending: &[PathBuf], cause: Option<&UploadError>) {
        summary.halted = true;
        let remaining = pending
            .iter()
            .filter(|p| !self.ledger.contains(&file_identifier(p)))
            .count();

        match cause {
            Some(UploadError::RateLimited { status, .. }) => {
                error!(%status, remaining, "Rate limited, halting batch");
                self.reporter.report(&UploadEvent::RateLimitHalted {
                    status: status.clone(),
                    remaining,
                });
            }
            Some(e) => {
                error!(error = %e, remaining, "Fatal error, halting batch");
                self.reporter.report(&UploadEvent::BatchHalted {
                    reason: e.to_string(),
                    remaining,
                });
            }
            None => {
                error!(status = %self.tracker.status(), remaining, "Rate limit exhausted, halting batch");
                self.reporter.report(&UploadEvent::RateLimitHalted {
                    status: self.tracker.status(),
                    remaining,
                });
            }
        }
    }
}
