// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the upload engine.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, UploadError};
use crate::ledger::DEFAULT_LEDGER_FILE;
use crate::types::ActivityType;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://www.strava.com/api/v3";

/// Configuration threaded into the orchestrator at construction.
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// API base URL, without trailing slash.
    pub api_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Maximum attempts per file (including the first).
    pub max_attempts: u32,
    /// Fixed delay before each retry.
    pub retry_delay: Duration,
    /// Fixed delay before each status poll.
    pub poll_interval: Duration,
    /// Maximum status polls per submission.
    pub max_polls: u32,
    /// Consecutive empty or failed polls after which the upload is assumed accepted.
    pub empty_response_threshold: u32,
    /// Consult the rate-limit tracker every this many files.
    pub rate_check_interval: usize,
    /// Directory scanned for activity files.
    pub resources_dir: PathBuf,
    /// File extension to pick up (without dot, case-insensitive).
    pub file_extension: String,
    /// Location of the idempotency ledger.
    pub ledger_path: PathBuf,
    /// Optional activity type override.
    pub activity_type: Option<ActivityType>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
            max_polls: 30,
            empty_response_threshold: 5,
            rate_check_interval: 10,
            resources_dir: PathBuf::from("Resources"),
            file_extension: "fit".to_string(),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILE),
            activity_type: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| UploadError::Config(format!("invalid {}: {}", name, e))),
        None => Ok(default),
    }
}

impl UploaderConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `FIT_UPLOADER_API_URL`: API base URL (default: "https://www.strava.com/api/v3")
    /// - `FIT_UPLOADER_REQUEST_TIMEOUT_MS`: HTTP timeout in milliseconds (default: 30000)
    /// - `FIT_UPLOADER_MAX_ATTEMPTS`: attempts per file (default: 3)
    /// - `FIT_UPLOADER_RETRY_DELAY_MS`: delay between attempts (default: 5000)
    /// - `FIT_UPLOADER_POLL_INTERVAL_MS`: delay between status polls (default: 2000)
    /// - `FIT_UPLOADER_MAX_POLLS`: status polls per upload (default: 30)
    /// - `FIT_UPLOADER_EMPTY_THRESHOLD`: consecutive empty polls treated as accepted (default: 5)
    /// - `FIT_UPLOADER_RATE_CHECK_INTERVAL`: files between rate-limit checks (default: 10)
    /// - `FIT_UPLOADER_RESOURCES_DIR`: directory to scan (default: "Resources")
    /// - `FIT_UPLOADER_LEDGER`: ledger file (default: "uploaded_files.json")
    /// - `FIT_UPLOADER_ACTIVITY_TYPE`: activity type override (default: auto-detect)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let api_url = lookup("FIT_UPLOADER_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let request_timeout_ms: u64 = parse_var(
            "FIT_UPLOADER_REQUEST_TIMEOUT_MS",
            lookup("FIT_UPLOADER_REQUEST_TIMEOUT_MS"),
            30_000,
        )?;
        let max_attempts: u32 = parse_var(
            "FIT_UPLOADER_MAX_ATTEMPTS",
            lookup("FIT_UPLOADER_MAX_ATTEMPTS"),
            defaults.max_attempts,
        )?;
        let retry_delay_ms: u64 = parse_var(
            "FIT_UPLOADER_RETRY_DELAY_MS",
            lookup("FIT_UPLOADER_RETRY_DELAY_MS"),
            5_000,
        )?;
        let poll_interval_ms: u64 = parse_var(
            "FIT_UPLOADER_POLL_INTERVAL_MS",
            lookup("FIT_UPLOADER_POLL_INTERVAL_MS"),
            2_000,
        )?;
        let max_polls: u32 = parse_var(
            "FIT_UPLOADER_MAX_POLLS",
            lookup("FIT_UPLOADER_MAX_POLLS"),
            defaults.max_polls,
        )?;
        let empty_response_threshold: u32 = parse_var(
            "FIT_UPLOADER_EMPTY_THRESHOLD",
            lookup("FIT_UPLOADER_EMPTY_THRESHOLD"),
            defaults.empty_response_threshold,
        )?;
        let rate_check_interval: usize = parse_var(
            "FIT_UPLOADER_RATE_CHECK_INTERVAL",
            lookup("FIT_UPLOADER_RATE_CHECK_INTERVAL"),
            defaults.rate_check_interval,
        )?;

        let resources_dir = lookup("FIT_UPLOADER_RESOURCES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.resources_dir);
        let ledger_path = lookup("FIT_UPLOADER_LEDGER")
            .map(PathBuf::from)
            .unwrap_or(defaults.ledger_path);

        let activity_type = match lookup("FIT_UPLOADER_ACTIVITY_TYPE") {
            Some(raw) if !raw.trim().is_empty() => Some(
                ActivityType::from_str(raw.trim()).map_err(|_| {
                    UploadError::Config(format!("invalid FIT_UPLOADER_ACTIVITY_TYPE: {}", raw))
                })?,
            ),
            _ => None,
        };

        let config = Self {
            api_url,
            request_timeout: Duration::from_millis(request_timeout_ms),
            max_attempts,
            retry_delay: Duration::from_millis(retry_delay_ms),
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_polls,
            empty_response_threshold,
            rate_check_interval,
            resources_dir,
            file_extension: defaults.file_extension,
            ledger_path,
            activity_type,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(UploadError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.max_polls == 0 {
            return Err(UploadError::Config("max_polls must be at least 1".to_string()));
        }
        if self.empty_response_threshold == 0 {
            return Err(UploadError::Config(
                "empty_response_threshold must be at least 1".to_string(),
            ));
        }
        if self.rate_check_interval == 0 {
            return Err(UploadError::Config(
                "rate_check_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the attempt budget per file.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the delay between status polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the poll budget per submission.
    pub fn with_max_polls(mut self, polls: u32) -> Self {
        self.max_polls = polls;
        self
    }

    /// Set the consecutive-empty-response threshold.
    pub fn with_empty_response_threshold(mut self, threshold: u32) -> Self {
        self.empty_response_threshold = threshold;
        self
    }

    /// Set how often (in files) the rate-limit tracker is consulted.
    pub fn with_rate_check_interval(mut self, files: usize) -> Self {
        self.rate_check_interval = files;
        self
    }

    /// Set the directory scanned for activity files.
    pub fn with_resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resources_dir = dir.into();
        self
    }

    /// Set the ledger location.
    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = path.into();
        self
    }

    /// Set the activity type override.
    pub fn with_activity_type(mut self, activity_type: Option<ActivityType>) -> Self {
        self.activity_type = activity_type;
        self
    }
}
