// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process [`HealthStore`] backed by `DashMap`.
//!
//! Used by tests and by local development when no GCP project is configured.
//! Keys mirror the Firestore document IDs so both stores share upsert semantics.

use crate::db::{connection_doc_id, metric_doc_id, new_lease_id, record_doc_id, HealthStore};
use crate::error::AppError;
use crate::models::connection::TokenUpdate;
use crate::models::{
    HealthMetric, OAuthConnection, RecoveryRecord, SleepRecord, SyncOutcome, SyncStatus,
    WorkoutRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    connections: DashMap<String, OAuthConnection>,
    sync_status: DashMap<String, SyncStatus>,
    recovery: DashMap<String, RecoveryRecord>,
    sleep: DashMap<String, SleepRecord>,
    workouts: DashMap<String, WorkoutRecord>,
    metrics: DashMap<String, HealthMetric>,
    /// Record upserts performed (including overwrites)
    record_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_writes(&self) -> usize {
        self.record_writes.load(Ordering::SeqCst)
    }

    pub fn recovery_count(&self) -> usize {
        self.recovery.len()
    }

    pub fn sleep_count(&self) -> usize {
        self.sleep.len()
    }

    pub fn workout_count(&self) -> usize {
        self.workouts.len()
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn recovery(&self, user_id: &str, external_id: &str) -> Option<RecoveryRecord> {
        self.recovery
            .get(&record_doc_id(user_id, external_id))
            .map(|r| r.clone())
    }

    pub fn sleep(&self, user_id: &str, external_id: &str) -> Option<SleepRecord> {
        self.sleep
            .get(&record_doc_id(user_id, external_id))
            .map(|r| r.clone())
    }

    pub fn workout(&self, user_id: &str, external_id: &str) -> Option<WorkoutRecord> {
        self.workouts
            .get(&record_doc_id(user_id, external_id))
            .map(|r| r.clone())
    }

    pub fn metric(&self, user_id: &str, metric_type: &str, external_id: &str) -> Option<HealthMetric> {
        self.metrics
            .get(&metric_doc_id(user_id, metric_type, external_id))
            .map(|r| r.clone())
    }

    /// Overwrite a status row as-is (test setup for stale or held leases).
    pub fn put_sync_status(&self, status: SyncStatus) {
        self.sync_status
            .insert(connection_doc_id(&status.user_id, &status.provider), status);
    }

    fn count_write(&self) {
        self.record_writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthStore for MemoryStore {
    async fn get_connection(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<OAuthConnection>, AppError> {
        Ok(self
            .connections
            .get(&connection_doc_id(user_id, provider))
            .map(|c| c.clone()))
    }

    async fn find_connection_by_external_user(
        &self,
        provider: &str,
        external_user_id: &str,
    ) -> Result<Option<OAuthConnection>, AppError> {
        Ok(self
            .connections
            .iter()
            .find(|c| {
                c.provider == provider && c.external_user_id.as_deref() == Some(external_user_id)
            })
            .map(|c| c.clone()))
    }

    async fn list_connections(&self, provider: &str) -> Result<Vec<OAuthConnection>, AppError> {
        let mut connections: Vec<OAuthConnection> = self
            .connections
            .iter()
            .filter(|c| c.provider == provider)
            .map(|c| c.clone())
            .collect();
        // DashMap iteration order is arbitrary
        connections.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(connections)
    }

    async fn upsert_connection(&self, connection: &OAuthConnection) -> Result<(), AppError> {
        self.connections.insert(
            connection_doc_id(&connection.user_id, &connection.provider),
            connection.clone(),
        );
        Ok(())
    }

    async fn update_connection_tokens(
        &self,
        user_id: &str,
        provider: &str,
        update: &TokenUpdate,
    ) -> Result<bool, AppError> {
        let Some(mut connection) = self.connections.get_mut(&connection_doc_id(user_id, provider))
        else {
            return Ok(false);
        };
        if let Some(expected) = &update.expected_access_token_encrypted {
            if *expected != connection.access_token_encrypted {
                return Ok(false);
            }
        }

        connection.access_token_encrypted = update.access_token_encrypted.clone();
        connection.refresh_token_encrypted = update.refresh_token_encrypted.clone();
        connection.token_expires_at = update.token_expires_at;
        connection.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_connection(&self, user_id: &str, provider: &str) -> Result<bool, AppError> {
        let key = connection_doc_id(user_id, provider);
        self.sync_status.remove(&key);
        Ok(self.connections.remove(&key).is_some())
    }

    async fn get_sync_status(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<SyncStatus>, AppError> {
        Ok(self
            .sync_status
            .get(&connection_doc_id(user_id, provider))
            .map(|s| s.clone()))
    }

    async fn init_sync_status(&self, status: &SyncStatus) -> Result<(), AppError> {
        self.sync_status
            .entry(connection_doc_id(&status.user_id, &status.provider))
            .or_insert_with(|| status.clone());
        Ok(())
    }

    async fn try_begin_sync(
        &self,
        user_id: &str,
        provider: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        let lease_id = new_lease_id()?;

        // The entry guard holds the shard lock for the whole check-and-set
        match self.sync_status.entry(connection_doc_id(user_id, provider)) {
            Entry::Occupied(mut entry) => {
                let status = entry.get_mut();
                if !status.can_begin(now) {
                    return Ok(None);
                }
                status.begin(&lease_id, now);
            }
            Entry::Vacant(entry) => {
                let mut status = SyncStatus::new(user_id, provider, now);
                status.begin(&lease_id, now);
                entry.insert(status);
            }
        }
        Ok(Some(lease_id))
    }

    async fn finish_sync(
        &self,
        user_id: &str,
        provider: &str,
        lease_id: &str,
        outcome: &SyncOutcome,
        cursor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        match self.sync_status.get_mut(&connection_doc_id(user_id, provider)) {
            Some(mut status) if status.holds_lease(lease_id) => {
                status.finish(outcome, cursor, now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_recovery(&self, record: &RecoveryRecord) -> Result<(), AppError> {
        self.count_write();
        self.recovery.insert(
            record_doc_id(&record.user_id, &record.external_id),
            record.clone(),
        );
        Ok(())
    }

    async fn upsert_sleep(&self, record: &SleepRecord) -> Result<(), AppError> {
        self.count_write();
        self.sleep.insert(
            record_doc_id(&record.user_id, &record.external_id),
            record.clone(),
        );
        Ok(())
    }

    async fn upsert_workout(&self, record: &WorkoutRecord) -> Result<(), AppError> {
        self.count_write();
        self.workouts.insert(
            record_doc_id(&record.user_id, &record.external_id),
            record.clone(),
        );
        Ok(())
    }

    async fn upsert_metric(&self, metric: &HealthMetric) -> Result<(), AppError> {
        self.count_write();
        self.metrics.insert(
            metric_doc_id(&metric.user_id, &metric.metric_type, &metric.external_id),
            metric.clone(),
        );
        Ok(())
    }
}
