// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Rate-limit tracking from response metadata.
//!
//! The API reports two accounting windows on every response:
//! - a short window (15 minutes)
//! - a long window (one day)
//!
//! Both arrive as comma-separated `short,long` pairs in `X-RateLimit-Limit`
//! and `X-RateLimit-Usage`. The tracker only keeps the latest observation and
//! is advisory: the remote may still reject work judged safe here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header carrying the `short,long` limits.
pub const LIMIT_HEADER: &str = "X-RateLimit-Limit";
/// Header carrying the `short,long` usage.
pub const USAGE_HEADER: &str = "X-RateLimit-Usage";

/// Usage ratio at which a window counts as near its limit.
pub const NEAR_LIMIT_RATIO: f64 = 0.8;

/// A `short,long` pair of counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPair {
    /// Short (15 minute) window.
    pub short: u32,
    /// Long (daily) window.
    pub long: u32,
}

impl WindowPair {
    /// Parse a `short,long` header value. Extra fields are ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(',').map(str::trim);
        let short = parts.next()?.parse().ok()?;
        let long = parts.next()?.parse().ok()?;
        Some(Self { short, long })
    }
}

/// Rate-limit metadata carried by one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    /// Limits, if the limit header was present and well formed.
    pub limit: Option<WindowPair>,
    /// Usage, if the usage header was present and well formed.
    pub usage: Option<WindowPair>,
}

impl RateLimitSnapshot {
    /// Build a snapshot from raw header values.
    ///
    /// Returns `None` when neither header parses, so callers can leave the
    /// tracker untouched.
    pub fn from_header_values(limit: Option<&str>, usage: Option<&str>) -> Option<Self> {
        let snapshot = Self {
            limit: limit.and_then(WindowPair::parse),
            usage: usage.and_then(WindowPair::parse),
        };
        if snapshot.limit.is_none() && snapshot.usage.is_none() {
            None
        } else {
            Some(snapshot)
        }
    }
}

/// Most recently observed usage and limits for both windows.
#[derive(Debug, Clone, Default)]
pub struct RateLimitTracker {
    short_usage: u32,
    short_limit: u32,
    long_usage: u32,
    long_limit: u32,
    last_refresh: Option<DateTime<Utc>>,
}

impl RateLimitTracker {
    /// Create a tracker with unknown state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in metadata from a response. `None` leaves the state unchanged.
    pub fn observe(&mut self, snapshot: Option<&RateLimitSnapshot>) {
        let Some(snapshot) = snapshot else {
            return;
        };
        if let Some(limit) = snapshot.limit {
            self.short_limit = limit.short;
            self.long_limit = limit.long;
        }
        if let Some(usage) = snapshot.usage {
            self.short_usage = usage.short;
            self.long_usage = usage.long;
        }
        self.last_refresh = Some(Utc::now());
    }

    /// Whether limits have been observed for both windows.
    pub fn is_known(&self) -> bool {
        self.short_limit > 0 && self.long_limit > 0
    }

    /// Usage ratio of each window, `None` for a window without a known limit.
    fn ratios(&self) -> [Option<f64>; 2] {
        let ratio = |usage: u32, limit: u32| {
            (limit > 0).then(|| f64::from(usage) / f64::from(limit))
        };
        [
            ratio(self.short_usage, self.short_limit),
            ratio(self.long_usage, self.long_limit),
        ]
    }

    /// Either window is at or above [`NEAR_LIMIT_RATIO`] of its limit.
    pub fn is_near_limit(&self) -> bool {
        self.ratios()
            .into_iter()
            .flatten()
            .any(|ratio| ratio >= NEAR_LIMIT_RATIO)
    }

    /// Either window's usage has reached its limit.
    pub fn is_exceeded(&self) -> bool {
        (self.short_limit > 0 && self.short_usage >= self.short_limit)
            || (self.long_limit > 0 && self.long_usage >= self.long_limit)
    }

    /// One-line status for display.
    pub fn status(&self) -> String {
        if !self.is_known() {
            return "Rate limits: Unknown".to_string();
        }
        format!(
            "15-min: {}/{} | Daily: {}/{}",
            self.short_usage, self.short_limit, self.long_usage, self.long_limit
        )
    }

    /// Usage percentages `(short, long)` once both limits are known.
    pub fn percentages(&self) -> Option<(f64, f64)> {
        match self.ratios() {
            [Some(short), Some(long)] => Some((short * 100.0, long * 100.0)),
            _ => None,
        }
    }

    /// Multi-line warning with percentages, `None` unless near the limit.
    pub fn warning(&self) -> Option<String> {
        if !self.is_near_limit() {
            return None;
        }
        let (short_pct, long_pct) = self.percentages()?;
        Some(format!(
            "15-min: {}/{} ({:.1}%)\nDaily: {}/{} ({:.1}%)",
            self.short_usage,
            self.short_limit,
            short_pct,
            self.long_usage,
            self.long_limit,
            long_pct
        ))
    }

    /// When the tracker last saw metadata.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }
}
