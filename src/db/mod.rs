// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Everything the sync subsystem persists goes through [`HealthStore`], which is
//! constructed once at startup and injected into [`crate::AppState`].

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::connection::TokenUpdate;
use crate::models::{
    HealthMetric, OAuthConnection, RecoveryRecord, SleepRecord, SyncOutcome, SyncStatus,
    WorkoutRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};

/// Collection names as constants.
pub mod collections {
    pub const CONNECTIONS: &str = "health_oauth_connections";
    pub const SYNC_STATUS: &str = "health_sync_status";
    pub const RECOVERY: &str = "health_recovery";
    pub const SLEEP: &str = "health_sleep";
    pub const WORKOUTS: &str = "health_workouts";
    pub const METRICS: &str = "health_metrics";
}

/// Document ID for per-(user, provider) rows.
pub fn connection_doc_id(user_id: &str, provider: &str) -> String {
    format!("{}_{}", urlencoding::encode(user_id), provider)
}

/// Document ID for per-(user, external id) records.
pub fn record_doc_id(user_id: &str, external_id: &str) -> String {
    format!(
        "{}_{}",
        urlencoding::encode(user_id),
        urlencoding::encode(external_id)
    )
}

/// Document ID for metrics, which share external IDs across metric types.
pub fn metric_doc_id(user_id: &str, metric_type: &str, external_id: &str) -> String {
    format!(
        "{}_{}_{}",
        urlencoding::encode(user_id),
        metric_type,
        urlencoding::encode(external_id)
    )
}

/// Random identifier for one sync pass's lease.
pub fn new_lease_id() -> Result<String, AppError> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;
    Ok(hex::encode(bytes))
}

/// Persistent store for connections, sync bookkeeping and health records.
#[async_trait]
pub trait HealthStore: Send + Sync {
    // ─── Connections ─────────────────────────────────────────────

    async fn get_connection(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<OAuthConnection>, AppError>;

    /// Look up the internal user behind a provider user ID (webhook routing).
    async fn find_connection_by_external_user(
        &self,
        provider: &str,
        external_user_id: &str,
    ) -> Result<Option<OAuthConnection>, AppError>;

    async fn list_connections(&self, provider: &str) -> Result<Vec<OAuthConnection>, AppError>;

    async fn upsert_connection(&self, connection: &OAuthConnection) -> Result<(), AppError>;

    /// Replace the sealed token pair.
    ///
    /// When `update.expected_access_token_encrypted` is set, the write only happens
    /// if the stored access token still matches it. Returns false, without
    /// writing, if the connection is gone or was rotated by someone else.
    async fn update_connection_tokens(
        &self,
        user_id: &str,
        provider: &str,
        update: &TokenUpdate,
    ) -> Result<bool, AppError>;

    /// Delete the connection and its sync status. Returns false if absent.
    async fn delete_connection(&self, user_id: &str, provider: &str) -> Result<bool, AppError>;

    // ─── Sync Status ─────────────────────────────────────────────

    async fn get_sync_status(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<SyncStatus>, AppError>;

    /// Create the status row unless one already exists.
    async fn init_sync_status(&self, status: &SyncStatus) -> Result<(), AppError>;

    /// Compare-and-set the per-user sync lease.
    ///
    /// On success `sync_state` is `in_progress`, `last_sync_attempt` is `now`, and
    /// the returned lease ID must be handed back to [`HealthStore::finish_sync`].
    /// Returns `None`, without writing, while another pass holds a fresh lease.
    async fn try_begin_sync(
        &self,
        user_id: &str,
        provider: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AppError>;

    /// Record the outcome and release the lease held as `lease_id`.
    ///
    /// Returns false, without writing, if the lease was taken over by another
    /// pass or the status row is gone (the connection was removed).
    async fn finish_sync(
        &self,
        user_id: &str,
        provider: &str,
        lease_id: &str,
        outcome: &SyncOutcome,
        cursor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    // ─── Records (upsert by user and external ID) ────────────────

    async fn upsert_recovery(&self, record: &RecoveryRecord) -> Result<(), AppError>;

    async fn upsert_sleep(&self, record: &SleepRecord) -> Result<(), AppError>;

    async fn upsert_workout(&self, record: &WorkoutRecord) -> Result<(), AppError>;

    async fn upsert_metric(&self, metric: &HealthMetric) -> Result<(), AppError>;
}
