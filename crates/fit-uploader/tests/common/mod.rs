// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared test doubles: a scripted gateway and a recording reporter.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fit_uploader::classify::{STATUS_PROCESSING, STATUS_READY};
use fit_uploader::{
    AthleteSummary, Observed, ProbeOutcome, ProgressReporter, RateLimitSnapshot,
    RemoteUploadHandle, Result, Submission, UploadError, UploadEvent, UploadGateway,
    UploaderConfig,
};

/// Gateway that replays queued responses in order and counts calls.
///
/// When a queue runs dry: submit fails with a transport error, polls return
/// an empty body, and the probe authenticates.
#[derive(Default)]
pub struct ScriptedGateway {
    submits: Mutex<VecDeque<Result<Observed<RemoteUploadHandle>>>>,
    polls: Mutex<VecDeque<Result<Observed<Option<RemoteUploadHandle>>>>>,
    probes: Mutex<VecDeque<Result<Observed<ProbeOutcome>>>>,
    submitted: Mutex<Vec<String>>,
    submit_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit(self, response: Result<Observed<RemoteUploadHandle>>) -> Self {
        self.submits.lock().unwrap().push_back(response);
        self
    }

    pub fn on_poll(self, response: Result<Observed<Option<RemoteUploadHandle>>>) -> Self {
        self.polls.lock().unwrap().push_back(response);
        self
    }

    pub fn on_probe(self, response: Result<Observed<ProbeOutcome>>) -> Self {
        self.probes.lock().unwrap().push_back(response);
        self
    }

    /// Queue a submission that gets tracked and then reads ready on the first poll.
    pub fn accepts_and_completes(self, upload_id: u64, activity_id: u64) -> Self {
        self.on_submit(Ok(Observed::bare(processing(upload_id))))
            .on_poll(Ok(Observed::bare(Some(ready(upload_id, activity_id)))))
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn remote_calls(&self) -> usize {
        self.submit_calls() + self.poll_calls()
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadGateway for ScriptedGateway {
    async fn submit(&self, submission: &Submission) -> Result<Observed<RemoteUploadHandle>> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted
            .lock()
            .unwrap()
            .push(submission.file_identifier.clone());
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(UploadError::Http("no scripted submit response".into())))
    }

    async fn poll_status(
        &self,
        _submission_id: u64,
    ) -> Result<Observed<Option<RemoteUploadHandle>>> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Observed::bare(None)))
    }

    async fn probe(&self) -> Result<Observed<ProbeOutcome>> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.probes.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(Observed::bare(ProbeOutcome::Authenticated(athlete())))
        })
    }
}

/// Reporter that keeps every event.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<UploadEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UploadEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&UploadEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: &UploadEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn athlete() -> AthleteSummary {
    AthleteSummary {
        id: 1234,
        first_name: Some("Jan".to_string()),
        last_name: Some("Kowalski".to_string()),
    }
}

pub fn processing(upload_id: u64) -> RemoteUploadHandle {
    RemoteUploadHandle {
        submission_id: upload_id,
        raw_status: Some(STATUS_PROCESSING.to_string()),
        ..Default::default()
    }
}

pub fn ready(upload_id: u64, activity_id: u64) -> RemoteUploadHandle {
    RemoteUploadHandle {
        submission_id: upload_id,
        raw_status: Some(STATUS_READY.to_string()),
        resulting_activity_id: Some(activity_id),
        ..Default::default()
    }
}

pub fn errored(upload_id: u64, error: &str) -> RemoteUploadHandle {
    RemoteUploadHandle {
        submission_id: upload_id,
        raw_status: Some(fit_uploader::classify::STATUS_ERROR.to_string()),
        error_text: Some(error.to_string()),
        ..Default::default()
    }
}

/// Snapshot with the usual 600/30000 limits and the given usage.
pub fn usage(short: u32, long: u32) -> Option<RateLimitSnapshot> {
    RateLimitSnapshot::from_header_values(
        Some("600,30000"),
        Some(&format!("{},{}", short, long)),
    )
}

/// Config with millisecond timings so paused-clock tests stay readable.
pub fn fast_config(dir: &Path) -> UploaderConfig {
    UploaderConfig::new()
        .with_retry_delay(Duration::from_millis(500))
        .with_poll_interval(Duration::from_millis(100))
        .with_resources_dir(dir.join("Resources"))
        .with_ledger_path(dir.join("uploaded_files.json"))
}

/// Create `names` as small files under `dir/Resources`.
pub fn write_activities(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    let resources = dir.join("Resources");
    std::fs::create_dir_all(&resources).unwrap();
    let mut paths: Vec<PathBuf> = names
        .iter()
        .map(|name| {
            let path = resources.join(name);
            std::fs::write(&path, b".FIT").unwrap();
            path
        })
        .collect();
    paths.sort();
    paths
}
