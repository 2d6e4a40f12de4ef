// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Sync bookkeeping for one user and provider.
//!
//! `sync_state` doubles as the per-user advisory lock: a pass may only start
//! when no other pass holds a fresh `in_progress` lease.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// How long an `in_progress` lease is honored before it is considered abandoned.
pub const SYNC_LEASE_MINUTES: i64 = 15;

/// Lifecycle of the current or most recent sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Connected, never synced
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Result of a finished pass, as recorded in the status row.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Success,
    Failure(String),
}

/// Stored sync status (one per user and provider).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncStatus {
    pub user_id: String,
    pub provider: String,
    #[serde(default)]
    pub sync_state: SyncState,
    pub last_successful_sync: Option<DateTime<Utc>>,
    pub last_sync_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Where the last pass stopped at the page cap, as `{category}:{next_token}`
    pub sync_cursor: Option<String>,
    /// Identifies the pass holding the `in_progress` lease
    #[serde(default)]
    pub lease_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncStatus {
    pub fn new(user_id: &str, provider: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            provider: provider.to_string(),
            sync_state: SyncState::Pending,
            last_successful_sync: None,
            last_sync_attempt: None,
            last_error: None,
            sync_cursor: None,
            lease_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a new pass may start at `now`.
    pub fn can_begin(&self, now: DateTime<Utc>) -> bool {
        if self.sync_state != SyncState::InProgress {
            return true;
        }
        match self.last_sync_attempt {
            Some(started) => now - started >= Duration::minutes(SYNC_LEASE_MINUTES),
            None => true,
        }
    }

    /// Take the lease. The attempt timestamp is written before any work.
    pub fn begin(&mut self, lease_id: &str, now: DateTime<Utc>) {
        self.sync_state = SyncState::InProgress;
        self.last_sync_attempt = Some(now);
        self.lease_id = Some(lease_id.to_string());
        self.updated_at = now;
    }

    /// Whether the pass identified by `lease_id` still owns the lease.
    ///
    /// False once another pass has taken over a stale lease.
    pub fn holds_lease(&self, lease_id: &str) -> bool {
        self.sync_state == SyncState::InProgress && self.lease_id.as_deref() == Some(lease_id)
    }

    /// Release the lease with the pass outcome.
    ///
    /// A failure keeps `last_successful_sync` untouched so "never synced" and
    /// "broken since X" stay distinguishable.
    pub fn finish(&mut self, outcome: &SyncOutcome, cursor: Option<&str>, now: DateTime<Utc>) {
        match outcome {
            SyncOutcome::Success => {
                self.sync_state = SyncState::Completed;
                self.last_successful_sync = Some(now);
                self.last_error = None;
            }
            SyncOutcome::Failure(message) => {
                self.sync_state = SyncState::Failed;
                self.last_error = Some(message.clone());
            }
        }
        self.sync_cursor = cursor.map(str::to_string);
        self.lease_id = None;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn test_lease_blocks_second_pass() {
        let mut status = SyncStatus::new("u1", "whoop", at(0));
        assert!(status.can_begin(at(0)));
        status.begin("a", at(0));
        assert!(!status.can_begin(at(1)));
        assert!(!status.can_begin(at(SYNC_LEASE_MINUTES - 1)));
    }

    #[test]
    fn test_stale_lease_can_be_taken_over() {
        let mut status = SyncStatus::new("u1", "whoop", at(0));
        status.begin("a", at(0));
        assert!(status.can_begin(at(SYNC_LEASE_MINUTES)));
    }

    #[test]
    fn test_failure_keeps_last_success() {
        let mut status = SyncStatus::new("u1", "whoop", at(0));
        status.begin("a", at(0));
        status.finish(&SyncOutcome::Success, None, at(1));
        assert_eq!(status.last_successful_sync, Some(at(1)));

        status.begin("b", at(10));
        status.finish(&SyncOutcome::Failure("boom".to_string()), Some("sleep:abc"), at(11));
        assert_eq!(status.sync_state, SyncState::Failed);
        assert_eq!(status.last_successful_sync, Some(at(1)));
        assert_eq!(status.last_sync_attempt, Some(at(10)));
        assert_eq!(status.last_error.as_deref(), Some("boom"));
        assert_eq!(status.sync_cursor.as_deref(), Some("sleep:abc"));

        // Failed is not terminal
        assert!(status.can_begin(at(12)));
        status.begin("c", at(12));
        status.finish(&SyncOutcome::Success, None, at(13));
        assert_eq!(status.last_error, None);
        assert_eq!(status.sync_cursor, None);
        assert_eq!(status.sync_state, SyncState::Completed);
    }

    #[test]
    fn test_taken_over_lease_is_no_longer_held() {
        let mut status = SyncStatus::new("u1", "whoop", at(0));
        status.begin("first", at(0));
        assert!(status.holds_lease("first"));

        status.begin("second", at(SYNC_LEASE_MINUTES + 1));
        assert!(!status.holds_lease("first"));
        assert!(status.holds_lease("second"));

        status.finish(&SyncOutcome::Success, None, at(SYNC_LEASE_MINUTES + 2));
        assert!(!status.holds_lease("second"));
        assert_eq!(status.lease_id, None);
    }
}
