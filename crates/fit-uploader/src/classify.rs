// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Free-text status and error classification.
//!
//! The upload API reports progress as human-readable sentences rather than a
//! structured state. Every substring check the engine relies on lives here so
//! the heuristic can be replaced in one place.

use crate::types::UploadPhase;

/// Status text while the remote is still processing.
pub const STATUS_PROCESSING: &str = "Your activity is still being processed.";
/// Status text once the activity exists.
pub const STATUS_READY: &str = "Your activity is ready.";
/// Status text when processing failed.
pub const STATUS_ERROR: &str = "There was an error processing your activity.";
/// Status text when the created activity was removed afterwards.
pub const STATUS_DELETED: &str = "The created activity has been deleted.";

const KNOWN_STATUSES: [&str; 4] = [STATUS_PROCESSING, STATUS_DELETED, STATUS_ERROR, STATUS_READY];

/// Verdict on the status of an upload that has no tracking id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntrackedVerdict {
    /// Reported ready with an activity id.
    Confirmed(u64),
    /// A known status, but nothing that proves an activity exists.
    KnownUnconfirmed,
    /// Empty or unrecognized status.
    Ambiguous,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Whether an error message says the content already exists remotely.
pub fn is_duplicate(error_text: &str) -> bool {
    contains_ignore_case(error_text, "duplicate")
}

/// Whether free-text status announces a ready activity.
pub fn mentions_ready(status: &str) -> bool {
    contains_ignore_case(status, "ready")
}

/// Whether free-text status announces an error.
pub fn mentions_error(status: &str) -> bool {
    contains_ignore_case(status, "error")
}

/// Whether the status is one of the sentences the API is known to produce.
pub fn is_known_status(status: &str) -> bool {
    KNOWN_STATUSES.contains(&status)
}

/// Derive the processing phase from status and error text.
pub fn phase_of(status: Option<&str>, error: Option<&str>) -> UploadPhase {
    if error.is_some_and(|e| !e.trim().is_empty()) {
        return UploadPhase::Error;
    }
    match status {
        Some(STATUS_PROCESSING) => UploadPhase::Processing,
        Some(STATUS_READY) => UploadPhase::Ready,
        Some(STATUS_ERROR) => UploadPhase::Error,
        _ => UploadPhase::Unknown,
    }
}

/// Classify an upload the remote accepted without assigning a tracking id.
pub fn classify_untracked(status: Option<&str>, activity_id: Option<u64>) -> UntrackedVerdict {
    match (status, activity_id) {
        (Some(STATUS_READY), Some(id)) => UntrackedVerdict::Confirmed(id),
        (Some(s), _) if !s.is_empty() && is_known_status(s) => UntrackedVerdict::KnownUnconfirmed,
        _ => UntrackedVerdict::Ambiguous,
    }
}
