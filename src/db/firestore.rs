// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides the [`HealthStore`] operations for:
//! - OAuth connections (sealed tokens, keyed by user and provider)
//! - Sync status (per-user lease, updated transactionally)
//! - Recovery, sleep, workout and metric records (upsert by external ID)

use crate::db::{
    collections, connection_doc_id, metric_doc_id, new_lease_id, record_doc_id, HealthStore,
};
use crate::error::AppError;
use crate::models::connection::TokenUpdate;
use crate::models::{
    HealthMetric, OAuthConnection, RecoveryRecord, SleepRecord, SyncOutcome, SyncStatus,
    WorkoutRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::{BackoffError, FirestoreError};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // Emulator connections skip credential discovery entirely
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn set_doc<T>(&self, collection: &str, doc_id: &str, object: &T) -> Result<(), AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Sync + Send,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(doc_id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_status_doc(&self, doc_id: &str) -> Result<Option<SyncStatus>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SYNC_STATUS)
            .obj()
            .one(doc_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl HealthStore for FirestoreDb {
    // ─── Connection Operations ───────────────────────────────────

    async fn get_connection(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<OAuthConnection>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CONNECTIONS)
            .obj()
            .one(&connection_doc_id(user_id, provider))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_connection_by_external_user(
        &self,
        provider: &str,
        external_user_id: &str,
    ) -> Result<Option<OAuthConnection>, AppError> {
        let provider = provider.to_string();
        let external_user_id = external_user_id.to_string();

        let matches: Vec<OAuthConnection> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::CONNECTIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("provider").eq(provider.clone()),
                    q.field("external_user_id").eq(external_user_id.clone()),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(matches.into_iter().next())
    }

    async fn list_connections(&self, provider: &str) -> Result<Vec<OAuthConnection>, AppError> {
        let provider = provider.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CONNECTIONS)
            .filter(move |q| q.for_all([q.field("provider").eq(provider.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_connection(&self, connection: &OAuthConnection) -> Result<(), AppError> {
        self.set_doc(
            collections::CONNECTIONS,
            &connection_doc_id(&connection.user_id, &connection.provider),
            connection,
        )
        .await
    }

    async fn update_connection_tokens(
        &self,
        user_id: &str,
        provider: &str,
        update: &TokenUpdate,
    ) -> Result<bool, AppError> {
        let doc_id = connection_doc_id(user_id, provider);
        let update = update.clone();

        // Compare and write in one transaction so two instances refreshing the
        // same user cannot both overwrite the stored pair
        self.get_client()?
            .run_transaction(|db, transaction| {
                let doc_id = doc_id.clone();
                let update = update.clone();
                async move {
                    let current: Option<OAuthConnection> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::CONNECTIONS)
                        .obj()
                        .one(&doc_id)
                        .await?;

                    let Some(mut connection) = current else {
                        return Ok::<bool, BackoffError<FirestoreError>>(false);
                    };
                    if let Some(expected) = &update.expected_access_token_encrypted {
                        if *expected != connection.access_token_encrypted {
                            return Ok(false);
                        }
                    }

                    connection.access_token_encrypted = update.access_token_encrypted;
                    connection.refresh_token_encrypted = update.refresh_token_encrypted;
                    connection.token_expires_at = update.token_expires_at;
                    connection.updated_at = Utc::now();

                    db.fluent()
                        .update()
                        .in_col(collections::CONNECTIONS)
                        .document_id(&doc_id)
                        .object(&connection)
                        .add_to_transaction(transaction)?;

                    Ok(true)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Token update transaction failed: {}", e)))
    }

    async fn delete_connection(&self, user_id: &str, provider: &str) -> Result<bool, AppError> {
        let doc_id = connection_doc_id(user_id, provider);
        let existed = self.get_connection(user_id, provider).await?.is_some();
        let client = self.get_client()?;

        for collection in [collections::CONNECTIONS, collections::SYNC_STATUS] {
            client
                .fluent()
                .delete()
                .from(collection)
                .document_id(&doc_id)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Ok(existed)
    }

    // ─── Sync Status Operations ──────────────────────────────────

    async fn get_sync_status(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<SyncStatus>, AppError> {
        self.get_status_doc(&connection_doc_id(user_id, provider))
            .await
    }

    async fn init_sync_status(&self, status: &SyncStatus) -> Result<(), AppError> {
        let doc_id = connection_doc_id(&status.user_id, &status.provider);
        if self.get_status_doc(&doc_id).await?.is_some() {
            return Ok(());
        }
        self.set_doc(collections::SYNC_STATUS, &doc_id, status).await
    }

    async fn try_begin_sync(
        &self,
        user_id: &str,
        provider: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        let doc_id = connection_doc_id(user_id, provider);
        let user_id = user_id.to_string();
        let provider = provider.to_string();
        let lease_id = new_lease_id()?;

        // Reads inside run_transaction lock the status document until commit
        let begun = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let doc_id = doc_id.clone();
                let user_id = user_id.clone();
                let provider = provider.clone();
                let lease_id = lease_id.clone();
                async move {
                    let current: Option<SyncStatus> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::SYNC_STATUS)
                        .obj()
                        .one(&doc_id)
                        .await?;

                    let mut status =
                        current.unwrap_or_else(|| SyncStatus::new(&user_id, &provider, now));
                    if !status.can_begin(now) {
                        return Ok::<Option<String>, BackoffError<FirestoreError>>(None);
                    }
                    status.begin(&lease_id, now);

                    db.fluent()
                        .update()
                        .in_col(collections::SYNC_STATUS)
                        .document_id(&doc_id)
                        .object(&status)
                        .add_to_transaction(transaction)?;

                    Ok(Some(lease_id))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Sync lease transaction failed: {}", e)))?;

        Ok(begun)
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
        let doc_id = connection_doc_id(user_id, provider);
        let lease_id = lease_id.to_string();
        let outcome = outcome.clone();
        let cursor = cursor.map(str::to_string);

        // A missing row means the connection was removed mid-pass; a foreign
        // lease means this pass was taken over. Neither may be written.
        self.get_client()?
            .run_transaction(|db, transaction| {
                let doc_id = doc_id.clone();
                let lease_id = lease_id.clone();
                let outcome = outcome.clone();
                let cursor = cursor.clone();
                async move {
                    let current: Option<SyncStatus> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::SYNC_STATUS)
                        .obj()
                        .one(&doc_id)
                        .await?;

                    let Some(mut status) = current.filter(|s| s.holds_lease(&lease_id)) else {
                        return Ok::<bool, BackoffError<FirestoreError>>(false);
                    };
                    status.finish(&outcome, cursor.as_deref(), now);

                    db.fluent()
                        .update()
                        .in_col(collections::SYNC_STATUS)
                        .document_id(&doc_id)
                        .object(&status)
                        .add_to_transaction(transaction)?;

                    Ok(true)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Sync finish transaction failed: {}", e)))
    }

    // ─── Record Operations ───────────────────────────────────────

    async fn upsert_recovery(&self, record: &RecoveryRecord) -> Result<(), AppError> {
        self.set_doc(
            collections::RECOVERY,
            &record_doc_id(&record.user_id, &record.external_id),
            record,
        )
        .await
    }

    async fn upsert_sleep(&self, record: &SleepRecord) -> Result<(), AppError> {
        self.set_doc(
            collections::SLEEP,
            &record_doc_id(&record.user_id, &record.external_id),
            record,
        )
        .await
    }

    async fn upsert_workout(&self, record: &WorkoutRecord) -> Result<(), AppError> {
        self.set_doc(
            collections::WORKOUTS,
            &record_doc_id(&record.user_id, &record.external_id),
            record,
        )
        .await
    }

    async fn upsert_metric(&self, metric: &HealthMetric) -> Result<(), AppError> {
        self.set_doc(
            collections::METRICS,
            &metric_doc_id(&metric.user_id, &metric.metric_type, &metric.external_id),
            metric,
        )
        .await
    }
}
