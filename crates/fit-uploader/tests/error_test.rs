// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error type tests for fit-uploader.

use fit_uploader::{RateLimitSnapshot, UploadError};

#[test]
fn test_config_error_display() {
    let err = UploadError::Config("max_attempts must be at least 1".to_string());
    assert!(err.to_string().contains("configuration error"));
    assert!(err.to_string().contains("max_attempts"));
}

#[test]
fn test_api_error_display() {
    let err = UploadError::Api {
        status: 500,
        message: "Internal error".to_string(),
        rate_limit: None,
    };
    let display = err.to_string();
    assert!(display.contains("api error"));
    assert!(display.contains("500"));
    assert!(display.contains("Internal error"));
}

#[test]
fn test_rate_limited_display_includes_status() {
    let err = UploadError::RateLimited {
        status: "15-min: 600/600 | Daily: 1000/30000".to_string(),
        rate_limit: None,
    };
    assert!(err.to_string().contains("rate limit exceeded"));
    assert!(err.to_string().contains("600/600"));
}

#[test]
fn test_retries_exhausted_display_wraps_last_error() {
    let err = UploadError::RetriesExhausted {
        attempts: 3,
        last_error: Box::new(UploadError::Processing("Corrupt file".to_string())),
    };
    let display = err.to_string();
    assert!(display.contains("all 3 attempts failed"));
    assert!(display.contains("Corrupt file"));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err: UploadError = io.into();
    assert!(matches!(err, UploadError::Io(_)));
    assert!(err.to_string().contains("file missing"));
}

#[test]
fn test_fatal_classification() {
    assert!(UploadError::Unauthorized.is_fatal());
    assert!(UploadError::MissingDirectory("Resources".to_string()).is_fatal());
    assert!(UploadError::Config("bad".to_string()).is_fatal());
    assert!(!UploadError::Http("reset".to_string()).is_fatal());
    assert!(!UploadError::Rejected("bad file".to_string()).is_fatal());
    assert!(!UploadError::Ledger("disk full".to_string()).is_fatal());
}

#[test]
fn test_exhausted_retries_inherit_fatality() {
    let fatal = UploadError::RetriesExhausted {
        attempts: 1,
        last_error: Box::new(UploadError::Unauthorized),
    };
    assert!(fatal.is_fatal());

    let transient = UploadError::RetriesExhausted {
        attempts: 3,
        last_error: Box::new(UploadError::Http("reset".to_string())),
    };
    assert!(!transient.is_fatal());
}

#[test]
fn test_rate_limit_metadata_travels_with_error() {
    let snapshot = RateLimitSnapshot::from_header_values(Some("600,30000"), Some("600,2000"));
    let err = UploadError::RetriesExhausted {
        attempts: 3,
        last_error: Box::new(UploadError::Api {
            status: 503,
            message: "unavailable".to_string(),
            rate_limit: snapshot,
        }),
    };
    assert_eq!(err.rate_limit().copied(), snapshot);
    assert!(UploadError::Unauthorized.rate_limit().is_none());
}
