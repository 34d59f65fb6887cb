// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP gateway for the Strava v3 upload API.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument};

use super::UploadGateway;
use crate::config::UploaderConfig;
use crate::error::{Result, UploadError};
use crate::rate_limit::{LIMIT_HEADER, RateLimitSnapshot, USAGE_HEADER};
use crate::types::{AthleteSummary, Observed, ProbeOutcome, RemoteUploadHandle, Submission};

/// Form value for the only supported file format.
const DATA_TYPE_FIT: &str = "fit";

/// Gateway that talks to the Strava API over HTTPS with a bearer token.
pub struct StravaGateway {
    client: Client,
    base_url: String,
}

impl StravaGateway {
    /// Create a gateway for the configured API using `access_token`.
    pub fn new(config: &UploaderConfig, access_token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", access_token.trim()))
            .map_err(|_| UploadError::Config("access token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| UploadError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// API base URL this gateway targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Parse rate-limit headers, `None` when absent or malformed.
pub fn rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitSnapshot> {
    let value = |name: &str| {
        let joined = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        (!joined.is_empty()).then_some(joined)
    };
    RateLimitSnapshot::from_header_values(
        value(LIMIT_HEADER).as_deref(),
        value(USAGE_HEADER).as_deref(),
    )
}

/// Turn a non-success status into the matching error.
///
/// The response's rate-limit metadata travels with the error so the caller
/// can still feed its tracker.
fn status_error(status: StatusCode, body: String, rate_limit: Option<RateLimitSnapshot>) -> UploadError {
    match status {
        StatusCode::UNAUTHORIZED => UploadError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => UploadError::RateLimited {
            status: rate_limit
                .and_then(|s| s.usage.zip(s.limit))
                .map(|(usage, limit)| {
                    format!(
                        "15-min: {}/{} | Daily: {}/{}",
                        usage.short, limit.short, usage.long, limit.long
                    )
                })
                .unwrap_or_else(|| "HTTP 429".to_string()),
            rate_limit,
        },
        _ => UploadError::Api {
            status: status.as_u16(),
            message: if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("no details").to_string()
            } else {
                body
            },
            rate_limit,
        },
    }
}

/// Read a response into (status, rate limit, body).
async fn read(response: Response) -> Result<(StatusCode, Option<RateLimitSnapshot>, String)> {
    let status = response.status();
    let rate_limit = rate_limit_from_headers(response.headers());
    let body = response.text().await?;
    Ok((status, rate_limit, body))
}

#[async_trait]
impl UploadGateway for StravaGateway {
    #[instrument(skip(self, submission), fields(file = %submission.file_identifier))]
    async fn submit(&self, submission: &Submission) -> Result<Observed<RemoteUploadHandle>> {
        let bytes = tokio::fs::read(&submission.local_path).await?;
        debug!(size = bytes.len(), "Submitting activity file");

        let part = Part::bytes(bytes)
            .file_name(submission.file_identifier.clone())
            .mime_str("application/octet-stream")?;
        let mut form = Form::new()
            .text("data_type", DATA_TYPE_FIT)
            .part("file", part);
        if let Some(activity_type) = submission.activity_type {
            form = form.text("activity_type", activity_type.as_form_value());
        }

        let response = self
            .client
            .post(self.url("uploads"))
            .multipart(form)
            .send()
            .await?;
        let (status, rate_limit, body) = read(response).await?;

        if !status.is_success() {
            return Err(status_error(status, body, rate_limit));
        }
        if body.trim().is_empty() {
            return Err(UploadError::Api {
                status: status.as_u16(),
                message: "no response received for upload".to_string(),
                rate_limit,
            });
        }

        let handle: RemoteUploadHandle = serde_json::from_str(&body)?;
        debug!(upload_id = handle.submission_id, status = handle.status_display(), "Upload accepted");
        Ok(Observed::with_rate_limit(handle, rate_limit))
    }

    #[instrument(skip(self))]
    async fn poll_status(&self, submission_id: u64) -> Result<Observed<Option<RemoteUploadHandle>>> {
        let response = self
            .client
            .get(self.url(&format!("uploads/{}", submission_id)))
            .send()
            .await?;
        let (status, rate_limit, body) = read(response).await?;

        if !status.is_success() {
            return Err(status_error(status, body, rate_limit));
        }
        if body.trim().is_empty() {
            debug!("Empty status response");
            return Ok(Observed::with_rate_limit(None, rate_limit));
        }

        let handle: Option<RemoteUploadHandle> = serde_json::from_str(&body)?;
        Ok(Observed::with_rate_limit(handle, rate_limit))
    }

    #[instrument(skip(self))]
    async fn probe(&self) -> Result<Observed<ProbeOutcome>> {
        let response = self.client.get(self.url("athlete")).send().await?;
        let (status, rate_limit, body) = read(response).await?;

        let outcome = match status {
            s if s.is_success() => {
                ProbeOutcome::Authenticated(serde_json::from_str(&body).unwrap_or_else(|e| {
                    debug!(error = %e, "Could not parse athlete profile");
                    AthleteSummary::default()
                }))
            }
            StatusCode::UNAUTHORIZED => ProbeOutcome::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => ProbeOutcome::RateLimited,
            s => ProbeOutcome::Failed {
                status: s.as_u16(),
                body,
            },
        };
        Ok(Observed::with_rate_limit(outcome, rate_limit))
    }
}
