// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! High-level types shared by the gateway, state machine and orchestrator.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::classify;
use crate::rate_limit::RateLimitSnapshot;

/// Activity type override sent with a submission.
///
/// Parsing is case-insensitive so config values like `ride` or `RIDE` work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ActivityType {
    AlpineSki,
    BackcountrySki,
    Canoeing,
    Crossfit,
    EBikeRide,
    Elliptical,
    Golf,
    Handcycle,
    Hike,
    IceSkate,
    InlineSkate,
    Kayaking,
    Kitesurf,
    NordicSki,
    Ride,
    RockClimbing,
    RollerSki,
    Rowing,
    Run,
    Sail,
    Skateboard,
    Snowboard,
    Snowshoe,
    Soccer,
    StairStepper,
    StandUpPaddling,
    Surfing,
    Swim,
    Velomobile,
    VirtualRide,
    VirtualRun,
    Walk,
    WeightTraining,
    Wheelchair,
    Windsurf,
    Workout,
    Yoga,
}

impl ActivityType {
    /// Form value expected by the upload endpoint.
    pub fn as_form_value(&self) -> String {
        self.to_string().to_lowercase()
    }
}

/// Remote-reported processing phase of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    /// Still being processed remotely.
    Processing,
    /// Processing finished and an activity exists.
    Ready,
    /// Processing failed (possibly as a duplicate).
    Error,
    /// Status text not recognized.
    Unknown,
}

/// One attempt to deliver one local file.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Stable name used for idempotency (the file's base name).
    pub file_identifier: String,
    /// Source location.
    pub local_path: PathBuf,
    /// Optional type override; `None` lets the remote auto-detect.
    pub activity_type: Option<ActivityType>,
}

impl Submission {
    /// Build a submission for a local file, using its base name as identifier.
    pub fn for_path(path: impl Into<PathBuf>, activity_type: Option<ActivityType>) -> Self {
        let local_path = path.into();
        let file_identifier = file_identifier(&local_path);
        Self {
            file_identifier,
            local_path,
            activity_type,
        }
    }
}

/// Base name of a path, falling back to the full display form.
pub fn file_identifier(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Upload resource as returned by the remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUploadHandle {
    /// Tracking id; 0 when the remote accepted bytes without tracking them.
    #[serde(default, rename = "id")]
    pub submission_id: u64,
    /// External identifier derived from the uploaded file name.
    #[serde(default)]
    pub external_id: Option<String>,
    /// Free-text status.
    #[serde(default, rename = "status")]
    pub raw_status: Option<String>,
    /// Free-text error, set when processing failed.
    #[serde(default, rename = "error")]
    pub error_text: Option<String>,
    /// Activity created once processing reaches Ready.
    #[serde(default, rename = "activity_id")]
    pub resulting_activity_id: Option<u64>,
}

impl RemoteUploadHandle {
    /// Phase derived from the status and error text.
    pub fn phase(&self) -> UploadPhase {
        classify::phase_of(self.raw_status.as_deref(), self.error_text.as_deref())
    }

    /// Whether the remote assigned a tracking id.
    pub fn is_tracked(&self) -> bool {
        self.submission_id > 0
    }

    /// Status text or a placeholder for display.
    pub fn status_display(&self) -> &str {
        self.raw_status.as_deref().unwrap_or("Unknown")
    }
}

/// Why a submission was assumed accepted without confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumedReason {
    /// The status endpoint kept answering with empty or failed responses.
    EmptyResponses(u32),
    /// The poll budget ran out while the upload was still processing.
    PollTimeout(u32),
}

/// Terminal success outcome of the upload state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// The remote already holds this content.
    Duplicate { message: String },
    /// Processing finished.
    Ready {
        upload_id: u64,
        activity_id: Option<u64>,
    },
    /// Accepted without a tracking id but reported ready with an activity.
    AcceptedUntracked { activity_id: u64 },
    /// Accepted and never confirmed; treated as delivered.
    AssumedAccepted {
        upload_id: u64,
        reason: AssumedReason,
    },
}

impl UploadOutcome {
    /// Activity id, when the remote reported one.
    pub fn activity_id(&self) -> Option<u64> {
        match self {
            UploadOutcome::Ready { activity_id, .. } => *activity_id,
            UploadOutcome::AcceptedUntracked { activity_id } => Some(*activity_id),
            UploadOutcome::Duplicate { .. } | UploadOutcome::AssumedAccepted { .. } => None,
        }
    }

    /// Whether the outcome was confirmed by the remote rather than inferred.
    pub fn is_confirmed(&self) -> bool {
        !matches!(self, UploadOutcome::AssumedAccepted { .. })
    }
}

/// Authenticated athlete, as reported by the probe endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AthleteSummary {
    /// Athlete id.
    #[serde(default)]
    pub id: u64,
    /// First name.
    #[serde(default, rename = "firstname")]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(default, rename = "lastname")]
    pub last_name: Option<String>,
}

impl AthleteSummary {
    /// "First Last", skipping missing parts.
    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of the authenticated probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Credential accepted.
    Authenticated(AthleteSummary),
    /// Credential rejected (401).
    Unauthorized,
    /// Rate limit reached (429).
    RateLimited,
    /// Any other non-success response.
    Failed { status: u16, body: String },
}

/// Gateway response together with the rate-limit metadata it carried.
#[derive(Debug, Clone)]
pub struct Observed<T> {
    /// Response payload.
    pub value: T,
    /// Parsed rate-limit headers, if present.
    pub rate_limit: Option<RateLimitSnapshot>,
}

impl<T> Observed<T> {
    /// Wrap a value with no rate-limit metadata.
    pub fn bare(value: T) -> Self {
        Self {
            value,
            rate_limit: None,
        }
    }

    /// Wrap a value with the given metadata.
    pub fn with_rate_limit(value: T, rate_limit: Option<RateLimitSnapshot>) -> Self {
        Self { value, rate_limit }
    }
}

/// Final tally of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Files discovered.
    pub discovered: usize,
    /// Files delivered during this run.
    pub succeeded: usize,
    /// Files skipped because the ledger already had them.
    pub skipped: usize,
    /// Files that exhausted every attempt.
    pub failed: usize,
    /// Files left untouched after the batch halted.
    pub not_attempted: usize,
    /// Ledger size after the run.
    pub total_delivered: usize,
    /// Successful uploads whose ledger write failed.
    pub ledger_write_failures: usize,
    /// Whether the rate limit stopped the batch early.
    pub halted: bool,
}

impl RunSummary {
    /// Whether every attempted file succeeded and the batch ran to the end.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.ledger_write_failures == 0 && !self.halted
    }
}
