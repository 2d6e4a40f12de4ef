// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync engine: one fetch, map, upsert pass for one user.
//!
//! Every trigger (scheduled sweep, manual sync, webhook) goes through
//! [`SyncEngine`], supplying only the user, the time window and the record
//! categories it cares about.

use crate::config::PROVIDER_WHOOP;
use crate::db::HealthStore;
use crate::error::AppError;
use crate::models::{
    HealthMetric, RecordCategory, RecoveryRecord, SleepRecord, SyncOutcome, WorkoutRecord,
};
use crate::services::normalize;
use crate::services::whoop::{
    fetch_all_pages, Collected, PageQuery, WhoopService, WhoopSession, DEFAULT_MAX_PAGES,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Date bounds for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// Trailing seven days ending at `now`.
    pub fn trailing(now: DateTime<Utc>) -> Self {
        let (start, end) = crate::time_utils::default_sync_window(now);
        Self { start, end }
    }
}

/// Records upserted per category in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub recovery: usize,
    pub sleep: usize,
    pub workout: usize,
    pub cycle: usize,
    /// Records returned by WHOOP but not yet scored
    pub skipped: usize,
}

impl SyncCounts {
    fn add(&mut self, category: RecordCategory, stored: usize, skipped: usize) {
        match category {
            RecordCategory::Recovery => self.recovery += stored,
            RecordCategory::Sleep => self.sleep += stored,
            RecordCategory::Workout => self.workout += stored,
            RecordCategory::Cycle => self.cycle += stored,
        }
        self.skipped += skipped;
    }
}

/// Result of a pass that was allowed to start.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub counts: SyncCounts,
    /// Message recorded as `last_error`, if any part of the pass failed
    pub error: Option<String>,
    /// `{category}:{next_token}` where the page cap stopped the pass
    pub cursor: Option<String>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// What a single-record (webhook) sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSyncOutcome {
    Stored,
    /// Found but not fully scored yet
    NotScored,
    /// Not in the latest page
    NotFound,
}

/// A mapped record ready to be written.
enum Normalized {
    Recovery(RecoveryRecord),
    Sleep(SleepRecord),
    Workout(WorkoutRecord),
    Metric(HealthMetric),
}

/// Orchestrates sync passes. Holds no per-user state between calls.
#[derive(Clone)]
pub struct SyncEngine {
    store: Arc<dyn HealthStore>,
    whoop: WhoopService,
    max_pages: usize,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn HealthStore>, whoop: WhoopService) -> Self {
        Self {
            store,
            whoop,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn store(&self) -> &Arc<dyn HealthStore> {
        &self.store
    }

    pub fn whoop(&self) -> &WhoopService {
        &self.whoop
    }

    /// Run one pass for `user_id` over `window`.
    ///
    /// Fails without writing anything if the user has no connection
    /// ([`AppError::NoConnection`]) or another pass holds the lease
    /// ([`AppError::SyncInProgress`]). Otherwise the attempt is recorded before any
    /// provider call, and the outcome is recorded after the last category.
    pub async fn sync_user(
        &self,
        user_id: &str,
        window: SyncWindow,
        categories: &[RecordCategory],
    ) -> Result<SyncReport, AppError> {
        if self
            .store
            .get_connection(user_id, PROVIDER_WHOOP)
            .await?
            .is_none()
        {
            return Err(AppError::NoConnection);
        }

        let Some(lease_id) = self
            .store
            .try_begin_sync(user_id, PROVIDER_WHOOP, Utc::now())
            .await?
        else {
            tracing::info!(user_id, "Sync already in progress, not starting another");
            return Err(AppError::SyncInProgress);
        };

        tracing::info!(
            user_id,
            start = %window.start,
            end = %window.end,
            "Sync pass started"
        );

        let (counts, errors, cursor) = self.run_pass(user_id, window, categories).await;

        let report = SyncReport {
            counts,
            error: (!errors.is_empty()).then(|| errors.join("; ")),
            cursor,
        };

        let outcome = match &report.error {
            None => SyncOutcome::Success,
            Some(message) => SyncOutcome::Failure(message.clone()),
        };
        let released = self
            .store
            .finish_sync(
                user_id,
                PROVIDER_WHOOP,
                &lease_id,
                &outcome,
                report.cursor.as_deref(),
                Utc::now(),
            )
            .await?;
        if !released {
            tracing::warn!(
                user_id,
                "Lease lost or connection removed during pass, outcome not recorded"
            );
        }

        match &report.error {
            None => tracing::info!(
                user_id,
                recovery = counts.recovery,
                sleep = counts.sleep,
                workout = counts.workout,
                skipped = counts.skipped,
                "Sync pass completed"
            ),
            Some(error) => tracing::warn!(user_id, error = %error, "Sync pass failed"),
        }

        Ok(report)
    }

    /// Fetch and store each category, collecting failures and the first
    /// category cut short by the page cap.
    ///
    /// A failure that leaves the connection unusable stops the pass; other
    /// failures are recorded and the next category still runs.
    async fn run_pass(
        &self,
        user_id: &str,
        window: SyncWindow,
        categories: &[RecordCategory],
    ) -> (SyncCounts, Vec<String>, Option<String>) {
        let mut counts = SyncCounts::default();
        let mut errors = Vec::new();
        let mut cursor = None;

        let session = match self.whoop.session_for_user(user_id).await {
            Ok(session) => session,
            Err(e) => {
                errors.push(e.to_string());
                return (counts, errors, cursor);
            }
        };

        let query = PageQuery::window(window.start, window.end);
        let now = Utc::now();

        for &category in categories {
            let result = match self.fetch_category(&session, category, &query, now).await {
                Ok((records, deferred)) => {
                    if let Some(token) = deferred {
                        cursor.get_or_insert_with(|| format!("{}:{}", category, token));
                    }
                    self.store_all(records).await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok((stored, skipped)) => {
                    tracing::debug!(user_id, %category, stored, skipped, "Category synced");
                    counts.add(category, stored, skipped);
                }
                Err(e) => {
                    tracing::warn!(user_id, %category, error = %e, "Category sync failed");
                    let broken = e.is_connection_broken();
                    errors.push(format!("{}: {}", category, e));
                    if broken {
                        break;
                    }
                }
            }
        }

        (counts, errors, cursor)
    }

    /// All pages of one category in the window, mapped, plus the continuation
    /// token left when the page cap was hit. Unscored records map to `None`.
    async fn fetch_category(
        &self,
        session: &WhoopSession,
        category: RecordCategory,
        query: &PageQuery,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Option<Normalized>>, Option<String>), AppError> {
        let user_id = session.user_id();
        let max_pages = self.max_pages;

        fn mapped<T>(
            collected: Collected<T>,
            map: impl Fn(&T) -> Option<Normalized>,
        ) -> (Vec<Option<Normalized>>, Option<String>) {
            let records = collected.records.iter().map(map).collect();
            (records, collected.deferred)
        }

        let records = match category {
            RecordCategory::Recovery => mapped(
                fetch_all_pages(
                    |token| {
                        let q = query.with_token(token);
                        async move { session.get_recovery(&q).await }
                    },
                    max_pages,
                )
                .await?,
                |item| normalize::map_recovery(user_id, item, now).map(Normalized::Recovery),
            ),
            RecordCategory::Sleep => mapped(
                fetch_all_pages(
                    |token| {
                        let q = query.with_token(token);
                        async move { session.get_sleep(&q).await }
                    },
                    max_pages,
                )
                .await?,
                |item| normalize::map_sleep(user_id, item).map(Normalized::Sleep),
            ),
            RecordCategory::Workout => mapped(
                fetch_all_pages(
                    |token| {
                        let q = query.with_token(token);
                        async move { session.get_workouts(&q).await }
                    },
                    max_pages,
                )
                .await?,
                |item| normalize::map_workout(user_id, item).map(Normalized::Workout),
            ),
            RecordCategory::Cycle => mapped(
                fetch_all_pages(
                    |token| {
                        let q = query.with_token(token);
                        async move { session.get_cycles(&q).await }
                    },
                    max_pages,
                )
                .await?,
                |item| normalize::map_cycle(user_id, item).map(Normalized::Metric),
            ),
        };

        Ok(records)
    }

    /// Returns `(stored, skipped)`.
    async fn store_all(&self, records: Vec<Option<Normalized>>) -> Result<(usize, usize), AppError> {
        let mut stored = 0;
        let mut skipped = 0;
        for record in records {
            match record {
                Some(record) => {
                    self.store_record(&record).await?;
                    stored += 1;
                }
                None => skipped += 1,
            }
        }
        Ok((stored, skipped))
    }

    async fn store_record(&self, record: &Normalized) -> Result<(), AppError> {
        match record {
            Normalized::Recovery(r) => self.store.upsert_recovery(r).await,
            Normalized::Sleep(r) => self.store.upsert_sleep(r).await,
            Normalized::Workout(r) => self.store.upsert_workout(r).await,
            Normalized::Metric(m) => self.store.upsert_metric(m).await,
        }
    }

    /// Re-fetch one record named by a webhook and store it if scored.
    ///
    /// WHOOP has no lookup by ID for these collections, so only the latest page
    /// is searched. Recovery events carry the cycle ID.
    pub async fn sync_single_record(
        &self,
        user_id: &str,
        category: RecordCategory,
        external_id: &str,
    ) -> Result<RecordSyncOutcome, AppError> {
        let session = self.whoop.session_for_user(user_id).await?;
        let latest = PageQuery::default();
        let now = Utc::now();

        let found: Option<Option<Normalized>> = match category {
            RecordCategory::Recovery => session
                .get_recovery(&latest)
                .await?
                .records
                .iter()
                .find(|item| item.record.cycle_id.0 == external_id)
                .map(|item| {
                    normalize::map_recovery(user_id, item, now).map(Normalized::Recovery)
                }),
            RecordCategory::Sleep => session
                .get_sleep(&latest)
                .await?
                .records
                .iter()
                .find(|item| item.record.id.0 == external_id)
                .map(|item| normalize::map_sleep(user_id, item).map(Normalized::Sleep)),
            RecordCategory::Workout => session
                .get_workouts(&latest)
                .await?
                .records
                .iter()
                .find(|item| item.record.id.0 == external_id)
                .map(|item| normalize::map_workout(user_id, item).map(Normalized::Workout)),
            RecordCategory::Cycle => session
                .get_cycles(&latest)
                .await?
                .records
                .iter()
                .find(|item| item.record.id.0 == external_id)
                .map(|item| normalize::map_cycle(user_id, item).map(Normalized::Metric)),
        };

        let outcome = match found {
            None => RecordSyncOutcome::NotFound,
            Some(None) => RecordSyncOutcome::NotScored,
            Some(Some(record)) => {
                self.store_record(&record).await?;
                RecordSyncOutcome::Stored
            }
        };

        tracing::info!(user_id, %category, external_id, ?outcome, "Single record sync");
        Ok(outcome)
    }
}
