// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Access token storage.
//!
//! The credential file keeps the field names of the original desktop tool so
//! existing `strava_config.json` files keep working:
//!
//! ```json
//! { "AccessToken": "...", "ActivityTypeOverride": "Ride" }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, bail};
use fit_uploader::ActivityType;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default credential file name.
pub const DEFAULT_CREDENTIALS_FILE: &str = "strava_config.json";

/// On-disk credential document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type_override: Option<String>,
}

/// Where the access token in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    File,
    Prompt,
}

/// Credential file plus its parsed contents.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    stored: StoredCredentials,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl CredentialStore {
    /// Read the credential file. Missing or unreadable files yield empty credentials.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stored = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Could not parse credential file");
                StoredCredentials::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => StoredCredentials::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read credential file");
                StoredCredentials::default()
            }
        };
        Self { path, stored }
    }

    /// Location of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed credential document, defaults when the file was missing or unreadable.
    pub fn stored(&self) -> &StoredCredentials {
        &self.stored
    }

    /// Token saved in the file, if any.
    pub fn stored_token(&self) -> Option<&str> {
        non_blank(self.stored.access_token.as_deref())
    }

    /// Activity type override from the file.
    ///
    /// Unknown names are logged and ignored so the remote auto-detects the type.
    pub fn activity_type(&self) -> Option<ActivityType> {
        let raw = non_blank(self.stored.activity_type_override.as_deref())?;
        match ActivityType::from_str(raw) {
            Ok(activity_type) => Some(activity_type),
            Err(_) => {
                warn!(value = raw, "Unknown activity type override, using auto-detection");
                None
            }
        }
    }

    /// Persist a new token, keeping the rest of the document.
    pub fn save_token(&mut self, token: &str) -> anyhow::Result<()> {
        self.stored.access_token = Some(token.trim().to_string());
        let json = serde_json::to_string_pretty(&self.stored)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        info!(path = %self.path.display(), "Access token saved");
        Ok(())
    }

    /// Pick the access token: environment first, then the file, then `prompt`.
    ///
    /// A prompted token is saved for later runs. Passing `None` for `prompt`
    /// turns a missing token into an error.
    pub fn resolve_token<F>(
        &mut self,
        env_token: Option<&str>,
        prompt: Option<F>,
    ) -> anyhow::Result<(String, TokenSource)>
    where
        F: FnOnce() -> io::Result<String>,
    {
        if let Some(token) = non_blank(env_token) {
            return Ok((token.to_string(), TokenSource::Environment));
        }
        if let Some(token) = self.stored_token() {
            return Ok((token.to_string(), TokenSource::File));
        }
        let Some(prompt) = prompt else {
            bail!(
                "no access token found (set STRAVA_ACCESS_TOKEN or add AccessToken to {})",
                self.path.display()
            );
        };

        let answer = prompt().context("failed to read access token")?;
        let token = answer.trim().to_string();
        if token.is_empty() {
            bail!("access token is required");
        }
        if let Err(e) = self.save_token(&token) {
            // The run can still proceed with the token in memory.
            warn!(error = %e, "Could not save credential file");
        }
        Ok((token, TokenSource::Prompt))
    }
}
