// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! FIT Uploader
//!
//! Engine for delivering a directory of FIT activity files to Strava so that
//! each file ends up uploaded at most once across runs.
//!
//! # Architecture
//!
//! - [`UploadLedger`] persists which files were delivered, so reruns skip them.
//! - [`RateLimitTracker`] records the two-window budget reported by the remote.
//! - [`UploadGateway`] is the remote seam; [`StravaGateway`] talks HTTP.
//! - [`UploadStateMachine`] submits one file and polls it to a terminal state.
//! - [`RetryController`] bounds attempts per file.
//! - [`BatchOrchestrator`] drives a whole run and returns a [`RunSummary`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fit_uploader::{
//!     BatchOrchestrator, NoopReporter, StravaGateway, UploadLedger, UploaderConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UploaderConfig::from_env()?;
//! let gateway = StravaGateway::new(&config, "access-token")?;
//! let ledger = UploadLedger::open(&config.ledger_path);
//!
//! let mut orchestrator =
//!     BatchOrchestrator::new(config, Arc::new(gateway), ledger, Arc::new(NoopReporter));
//! let summary = orchestrator.run().await?;
//! println!("Uploaded {} new files", summary.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod classify;
mod config;
mod error;
pub mod gateway;
mod ledger;
mod orchestrator;
pub mod rate_limit;
mod reporter;
mod retry;
pub mod scan;
mod types;
pub mod upload;

pub use config::{DEFAULT_API_URL, UploaderConfig};
pub use error::{Result, UploadError};
pub use gateway::{StravaGateway, UploadGateway};
pub use ledger::{DEFAULT_LEDGER_FILE, LedgerOrigin, UploadLedger};
pub use orchestrator::BatchOrchestrator;
pub use rate_limit::{RateLimitSnapshot, RateLimitTracker, WindowPair};
pub use reporter::{NoopReporter, ProgressReporter, UploadEvent};
pub use retry::{RetryController, RetryPolicy};
pub use types::{
    ActivityType, AssumedReason, AthleteSummary, Observed, ProbeOutcome, RemoteUploadHandle,
    RunSummary, Submission, UploadOutcome, UploadPhase, file_identifier,
};
pub use upload::{PollPolicy, UploadStateMachine};
