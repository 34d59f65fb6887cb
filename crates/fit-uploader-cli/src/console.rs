// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Console progress output.

use std::io::{self, Write};
use std::sync::Mutex;

use fit_uploader::{ProgressReporter, RunSummary, UploadEvent, UploadOutcome, UploadPhase};

/// Prints one human-readable line (or block) per engine event.
pub struct ConsoleReporter<W: Write + Send = io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleReporter {
    /// Reporter writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Text for one event, without trailing newline. Empty means print nothing.
pub fn render(event: &UploadEvent) -> String {
    match event {
        UploadEvent::Authenticated {
            athlete,
            rate_limit,
        } => format!(
            "[OK] Token validated successfully\n  Authenticated as: {}\n  {}\n",
            athlete, rate_limit
        ),
        UploadEvent::BatchStarted { total: 0 } => "No .fit files found.".to_string(),
        UploadEvent::BatchStarted { total } => format!("Found {} file(s) to process.\n", total),
        UploadEvent::FileStarted { index, total, file } => {
            format!("[{}/{}] Processing: {}", index, total, file)
        }
        UploadEvent::Skipped { .. } => "  Skipped - already uploaded previously\n".to_string(),
        UploadEvent::Submitting { activity_type, .. } => match activity_type {
            Some(t) => format!(
                "  Uploading to Strava...\n  Using configured activity type: {}",
                t
            ),
            None => "  Uploading to Strava...\n  Activity type will be auto-detected from .FIT file"
                .to_string(),
        },
        UploadEvent::Submitted {
            upload_id,
            status,
            phase,
        } => format!(
            "  Upload ID: {} - Status: {}\n  Current Status: {}",
            upload_id,
            status,
            phase_label(*phase)
        ),
        UploadEvent::Polled {
            check,
            phase: None,
            ..
        } => format!("  Check {}: Still processing (empty API response)...", check),
        UploadEvent::Polled {
            phase: Some(UploadPhase::Processing),
            ..
        } => "  Still processing...".to_string(),
        UploadEvent::Polled { .. } => String::new(),
        UploadEvent::DuplicateDetected { message } => {
            format!("  Duplicate detected: {}\n  Treating as success", message)
        }
        UploadEvent::AssumedAccepted { upload_id, detail } => format!(
            "  {}\n  Upload was accepted (ID: {}) - treating as success\n  Check your Strava account to confirm the activity appears",
            capitalize(detail),
            upload_id
        ),
        UploadEvent::AttemptFailed { attempt, error, .. } => {
            format!("  Attempt {} failed: {}", attempt, error)
        }
        UploadEvent::RetryScheduled {
            attempt,
            max_attempts,
            ..
        } => format!("  Retry attempt {}/{}...", attempt, max_attempts),
        UploadEvent::FileSucceeded { outcome, .. } => match outcome {
            UploadOutcome::Ready {
                activity_id: Some(id),
                ..
            }
            | UploadOutcome::AcceptedUntracked { activity_id: id } => format!(
                "  [OK] Upload complete!\n  Activity ID: {}\n  [SUCCESS] Successfully uploaded\n",
                id
            ),
            UploadOutcome::Ready { .. } => {
                "  [OK] Upload complete!\n  [SUCCESS] Successfully uploaded\n".to_string()
            }
            UploadOutcome::Duplicate { .. } | UploadOutcome::AssumedAccepted { .. } => {
                "  [SUCCESS] Successfully uploaded\n".to_string()
            }
        },
        UploadEvent::FileFailed { error, .. } => {
            format!("  All retry attempts exhausted.\n  [FAILED] Failed to upload: {}\n", error)
        }
        UploadEvent::LedgerWriteFailed { file, error } => format!(
            "  ERROR: Could not record {} as uploaded: {}\n  It may be uploaded again on the next run",
            file, error
        ),
        UploadEvent::RateLimitWarning { detail } => {
            let body: Vec<String> = detail.lines().map(|l| format!("  {}", l)).collect();
            format!(
                "\n? Rate Limit Warning:\n{}\n  Consider slowing down to avoid being rate limited.\n",
                body.join("\n")
            )
        }
        UploadEvent::RateLimitHalted { status, remaining } => format!(
            "  Rate Limit Exceeded!\n  Strava API limits: 600 requests per 15 minutes, 30,000 per day\n  Current status: {}\n  {} file(s) left for a later run. Please wait before trying again.\n",
            status, remaining
        ),
        UploadEvent::BatchHalted { reason, remaining } => format!(
            "  Stopping: {}\n  {} file(s) left for a later run.\n",
            reason, remaining
        ),
    }
}

fn phase_label(phase: UploadPhase) -> &'static str {
    match phase {
        UploadPhase::Processing => "Processing",
        UploadPhase::Ready => "Ready",
        UploadPhase::Error => "Error",
        UploadPhase::Unknown => "Unknown",
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// End-of-run summary block.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut lines = vec![
        "=== Upload Summary ===".to_string(),
        format!("Successful: {}", summary.succeeded),
    ];
    if summary.skipped > 0 {
        lines.push(format!("Skipped: {}", summary.skipped));
    }
    if summary.failed > 0 {
        lines.push(format!("Failed: {}", summary.failed));
    }
    if summary.not_attempted > 0 {
        lines.push(format!("Not attempted (rate limited): {}", summary.not_attempted));
    }
    if summary.ledger_write_failures > 0 {
        lines.push(format!(
            "Not recorded in ledger: {}",
            summary.ledger_write_failures
        ));
    }
    lines.push(format!(
        "Total previously uploaded: {}",
        summary.total_delivered
    ));
    lines.join("\n")
}

impl<W: Write + Send> ProgressReporter for ConsoleReporter<W> {
    fn report(&self, event: &UploadEvent) {
        let text = render(event);
        if text.is_empty() {
            return;
        }
        if let Ok(mut out) = self.out.lock() {
            // Progress output is best effort.
            let _ = writeln!(out, "{}", text);
            let _ = out.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fit_uploader::ActivityType;

    #[test]
    fn test_file_started_line() {
        let line = render(&UploadEvent::FileStarted {
            index: 2,
            total: 7,
            file: "ride.fit".to_string(),
        });
        assert_eq!(line, "[2/7] Processing: ride.fit");
    }

    #[test]
    fn test_submitting_mentions_activity_type() {
        let line = render(&UploadEvent::Submitting {
            file: "ride.fit".to_string(),
            activity_type: Some(ActivityType::VirtualRide),
        });
        assert!(line.contains("Using configured activity type: VirtualRide"));

        let line = render(&UploadEvent::Submitting {
            file: "ride.fit".to_string(),
            activity_type: None,
        });
        assert!(line.contains("auto-detected"));
    }

    #[test]
    fn test_rate_limit_warning_is_indented() {
        let line = render(&UploadEvent::RateLimitWarning {
            detail: "15-min: 500/600 (83.3%)\nDaily: 100/30000 (0.3%)".to_string(),
        });
        assert!(line.contains("Rate Limit Warning:"));
        assert!(line.contains("\n  15-min: 500/600 (83.3%)\n  Daily: 100/30000 (0.3%)"));
    }

    #[test]
    fn test_batch_halted_names_reason() {
        let line = render(&UploadEvent::BatchHalted {
            reason: "access token rejected".to_string(),
            remaining: 4,
        });
        assert!(line.contains("Stopping: access token rejected"));
        assert!(line.contains("4 file(s) left"));
    }

    #[test]
    fn test_ready_outcome_shows_activity_id() {
        let line = render(&UploadEvent::FileSucceeded {
            file: "ride.fit".to_string(),
            outcome: UploadOutcome::Ready {
                upload_id: 1,
                activity_id: Some(987),
            },
        });
        assert!(line.contains("Activity ID: 987"));
        assert!(line.contains("[SUCCESS]"));
    }

    #[test]
    fn test_summary_omits_zero_counters() {
        let summary = RunSummary {
            discovered: 3,
            succeeded: 2,
            skipped: 1,
            total_delivered: 5,
            ..RunSummary::default()
        };
        let text = render_summary(&summary);
        assert!(text.contains("Successful: 2"));
        assert!(text.contains("Skipped: 1"));
        assert!(!text.contains("Failed"));
        assert!(text.ends_with("Total previously uploaded: 5"));
    }

    #[test]
    fn test_reporter_writes_to_sink() {
        let reporter = ConsoleReporter::new(Vec::new());
        reporter.report(&UploadEvent::Skipped {
            file: "a.fit".to_string(),
        });
        reporter.report(&UploadEvent::Polled {
            check: 1,
            phase: Some(UploadPhase::Ready),
            status: None,
        });
        let written = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(written, "  Skipped - already uploaded previously\n\n");
    }
}
