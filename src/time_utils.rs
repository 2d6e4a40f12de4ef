// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and sync windows.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Trailing window covered by scheduled and manual syncs.
pub const DEFAULT_SYNC_WINDOW_DAYS: i64 = 7;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// RFC3339 with millisecond precision, the format WHOOP expects for `start`/`end`.
pub fn format_utc_rfc3339_millis(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `(now - 7 days, now)`.
pub fn default_sync_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(DEFAULT_SYNC_WINDOW_DAYS), now)
}
