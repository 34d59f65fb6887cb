// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Progress events emitted by the engine.
//!
//! The engine never prints. Front ends implement [`ProgressReporter`] to turn
//! events into console lines, and tests use it to observe what happened.

use std::time::Duration;

use crate::types::{ActivityType, UploadOutcome, UploadPhase};

/// Something worth telling the operator about.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// The access token was accepted.
    Authenticated { athlete: String, rate_limit: String },
    /// Candidate files were enumerated.
    BatchStarted { total: usize },
    /// Processing of one file begins (`index` is 1-based).
    FileStarted {
        index: usize,
        total: usize,
        file: String,
    },
    /// File already delivered in an earlier run.
    Skipped { file: String },
    /// Bytes are about to be sent.
    Submitting {
        file: String,
        activity_type: Option<ActivityType>,
    },
    /// The submission call returned.
    Submitted {
        upload_id: u64,
        status: String,
        phase: UploadPhase,
    },
    /// One status poll completed. `phase` is `None` for an empty or failed response.
    Polled {
        check: u32,
        phase: Option<UploadPhase>,
        status: Option<String>,
    },
    /// The remote flagged the content as already present.
    DuplicateDetected { message: String },
    /// Success was inferred without confirmation.
    AssumedAccepted { upload_id: u64, detail: String },
    /// One attempt failed.
    AttemptFailed {
        attempt: u32,
        max_attempts: u32,
        error: String,
    },
    /// Another attempt follows after `delay`.
    RetryScheduled {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
    /// The file was delivered.
    FileSucceeded { file: String, outcome: UploadOutcome },
    /// The file failed after every attempt.
    FileFailed { file: String, error: String },
    /// Upload succeeded but the ledger could not be written.
    LedgerWriteFailed { file: String, error: String },
    /// Usage is close to a rate limit.
    RateLimitWarning { detail: String },
    /// A rate limit is exhausted; remaining files are left for a later run.
    RateLimitHalted { status: String, remaining: usize },
    /// A fatal error other than a rate limit stopped the batch.
    BatchHalted { reason: String, remaining: usize },
}

/// Sink for [`UploadEvent`]s.
pub trait ProgressReporter: Send + Sync {
    /// Handle one event.
    fn report(&self, event: &UploadEvent);
}

/// Reporter that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: &UploadEvent) {}
}
