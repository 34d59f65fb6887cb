// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistent record of files already delivered.
//!
//! The ledger is a JSON array of file names on disk. It is the only state that
//! crosses run boundaries. Membership is case-insensitive. Every insertion is
//! written through before `add` returns, so a crash can at worst cause one
//! duplicate attempt, never a lost delivery record.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, UploadError};

/// Default ledger file name.
pub const DEFAULT_LEDGER_FILE: &str = "uploaded_files.json";

/// How a ledger was initialised from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOrigin {
    /// No file existed; an empty ledger was created.
    Created,
    /// Entries were loaded from an existing file.
    Loaded,
    /// The file existed but could not be read; starting empty.
    Recovered,
}

/// File-backed set of delivered file identifiers.
#[derive(Debug)]
pub struct UploadLedger {
    path: PathBuf,
    /// Lowercased key -> name as first recorded.
    entries: BTreeMap<String, String>,
    origin: LedgerOrigin,
}

fn key(file_identifier: &str) -> String {
    file_identifier.to_lowercase()
}

impl UploadLedger {
    /// Load the ledger at `path`.
    ///
    /// A missing file yields an empty ledger and is created immediately.
    /// Unreadable or corrupt contents are logged and replaced by an empty set
    /// (re-upload risk is preferred over refusing to run).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        if !path.exists() {
            let ledger = Self {
                path,
                entries: BTreeMap::new(),
                origin: LedgerOrigin::Created,
            };
            match ledger.persist() {
                Ok(()) => info!(path = %ledger.path.display(), "Created upload ledger"),
                Err(e) => warn!(path = %ledger.path.display(), error = %e, "Could not create upload ledger"),
            }
            return ledger;
        }

        match Self::read_entries(&path) {
            Ok(names) => {
                let entries: BTreeMap<String, String> = names
                    .into_iter()
                    .map(|name| (key(&name), name))
                    .collect();
                info!(
                    path = %path.display(),
                    count = entries.len(),
                    "Loaded upload ledger"
                );
                Self {
                    path,
                    entries,
                    origin: LedgerOrigin::Loaded,
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not load upload ledger, starting empty");
                Self {
                    path,
                    entries: BTreeMap::new(),
                    origin: LedgerOrigin::Recovered,
                }
            }
        }
    }

    fn read_entries(path: &Path) -> Result<Vec<String>> {
        let raw = fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let names: Option<Vec<String>> = serde_json::from_str(&raw)?;
        Ok(names.unwrap_or_default())
    }

    /// Whether the file was already delivered.
    pub fn contains(&self, file_identifier: &str) -> bool {
        self.entries.contains_key(&key(file_identifier))
    }

    /// Record a delivery and write the ledger through to disk.
    ///
    /// Returns `Ok(false)` when the identifier was already present (nothing is
    /// written). On a write error the entry stays recorded in memory so the
    /// rest of the run still skips it.
    pub fn add(&mut self, file_identifier: &str) -> Result<bool> {
        let k = key(file_identifier);
        if self.entries.contains_key(&k) {
            return Ok(false);
        }
        self.entries.insert(k, file_identifier.to_string());
        self.persist()?;
        debug!(file = file_identifier, "Marked as uploaded in ledger");
        Ok(true)
    }

    /// Number of delivered identifiers.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How the ledger was initialised.
    pub fn origin(&self) -> LedgerOrigin {
        self.origin
    }

    /// Recorded identifiers, sorted case-insensitively.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    /// Atomically replace the backing file with the current entries.
    fn persist(&self) -> Result<()> {
        let names: Vec<&str> = self.entries().collect();
        let json = serde_json::to_string_pretty(&names)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                UploadError::Ledger(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json.as_bytes())
            .map_err(|e| UploadError::Ledger(format!("failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            UploadError::Ledger(format!("failed to replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}
