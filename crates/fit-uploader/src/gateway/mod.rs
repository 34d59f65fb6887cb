// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Remote upload gateway.
//!
//! This module provides the abstraction the engine talks to:
//! - `strava`: HTTP implementation against the Strava v3 API

pub mod strava;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Observed, ProbeOutcome, RemoteUploadHandle, Submission};

pub use self::strava::StravaGateway;

/// Remote procedures the upload engine depends on.
///
/// Every call hands back the rate-limit metadata of its response so the
/// caller can keep its tracker current.
#[async_trait]
pub trait UploadGateway: Send + Sync {
    /// Submit a FIT file. May fail at the transport level.
    async fn submit(&self, submission: &Submission) -> Result<Observed<RemoteUploadHandle>>;

    /// Query processing status for a tracked submission.
    ///
    /// `None` means the remote answered with an empty body, which happens
    /// transiently while an upload is processed.
    async fn poll_status(&self, submission_id: u64)
    -> Result<Observed<Option<RemoteUploadHandle>>>;

    /// Lightweight authenticated request used to validate the credential and
    /// to refresh rate-limit metadata.
    async fn probe(&self) -> Result<Observed<ProbeOutcome>>;
}
