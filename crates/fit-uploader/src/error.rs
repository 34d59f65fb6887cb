// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for fit-uploader.

use thiserror::Error;

use crate::rate_limit::RateLimitSnapshot;

/// Result type using UploadError.
pub type Result<T> = std::result::Result<T, UploadError>;

/// Errors that can occur while delivering activity files.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Local I/O failed (reading an activity file, scanning a directory).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(String),

    /// Remote API returned a non-success status.
    #[error("api error [{status}]: {message}")]
    Api {
        status: u16,
        message: String,
        /// Rate-limit headers carried by the failing response.
        rate_limit: Option<RateLimitSnapshot>,
    },

    /// Access token was rejected.
    #[error("unauthorized: invalid or expired access token")]
    Unauthorized,

    /// Remote rate limit reached.
    #[error("rate limit exceeded ({status})")]
    RateLimited {
        status: String,
        /// Rate-limit headers carried by the failing response.
        rate_limit: Option<RateLimitSnapshot>,
    },

    /// Submission came back in the error phase.
    #[error("upload rejected: {0}")]
    Rejected(String),

    /// Remote processing reported an error while polling.
    #[error("processing error: {0}")]
    Processing(String),

    /// Submission was not assigned a tracking id and its status is unconfirmable.
    #[error("upload not tracked: {0}")]
    Untracked(String),

    /// Idempotency ledger could not be persisted.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Input directory is absent.
    #[error("directory not found: {0}")]
    MissingDirectory(String),

    /// Every attempt for a file failed.
    #[error("all {attempts} attempts failed: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: Box<UploadError>,
    },
}

impl UploadError {
    /// Whether this error must abort the whole batch rather than a single file.
    ///
    /// An exhausted retry budget is fatal when its last failure was.
    pub fn is_fatal(&self) -> bool {
        match self {
            UploadError::Config(_)
            | UploadError::Unauthorized
            | UploadError::RateLimited { .. }
            | UploadError::MissingDirectory(_) => true,
            UploadError::RetriesExhausted { last_error, .. } => last_error.is_fatal(),
            _ => false,
        }
    }

    /// Rate-limit metadata of the response that caused this error, if any.
    pub fn rate_limit(&self) -> Option<&RateLimitSnapshot> {
        match self {
            UploadError::Api { rate_limit, .. } | UploadError::RateLimited { rate_limit, .. } => {
                rate_limit.as_ref()
            }
            UploadError::RetriesExhausted { last_error, .. } => last_error.rate_limit(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Http(err.to_string())
    }
}
