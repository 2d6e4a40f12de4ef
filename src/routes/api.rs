// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated dashboard users.

use crate::config::PROVIDER_WHOOP;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::SyncState;
use crate::services::triggers::{manual_sync, ManualSyncResult};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sync", post(trigger_sync))
        .route(
            "/api/connection",
            get(get_connection).delete(delete_connection),
        )
}

// ─── Manual Sync ─────────────────────────────────────────────

/// Sync the caller's data now.
///
/// Always 200; `success: false` carries the reason.
async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ManualSyncResult> {
    tracing::info!(user_id = %user.user_id, "User-initiated sync");
    Json(manual_sync(&state.sync_engine, &user.user_id).await)
}

// ─── Connection Status ───────────────────────────────────────

/// Sync status summary.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncStatusResponse {
    pub sync_state: SyncState,
    pub last_successful_sync: Option<String>,
    pub last_sync_attempt: Option<String>,
    pub last_error: Option<String>,
}

/// Connection summary. Never includes tokens.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectionResponse {
    pub connected: bool,
    pub provider: String,
    pub external_user_id: Option<String>,
    pub scopes: Vec<String>,
    pub connected_at: Option<String>,
    pub sync: Option<SyncStatusResponse>,
}

async fn get_connection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConnectionResponse>> {
    let connection = state
        .store
        .get_connection(&user.user_id, PROVIDER_WHOOP)
        .await?;

    let Some(connection) = connection else {
        return Ok(Json(ConnectionResponse {
            connected: false,
            provider: PROVIDER_WHOOP.to_string(),
            external_user_id: None,
            scopes: Vec::new(),
            connected_at: None,
            sync: None,
        }));
    };

    let sync = state
        .store
        .get_sync_status(&user.user_id, PROVIDER_WHOOP)
        .await?
        .map(|status| SyncStatusResponse {
            sync_state: status.sync_state,
            last_successful_sync: status.last_successful_sync.map(format_utc_rfc3339),
            last_sync_attempt: status.last_sync_attempt.map(format_utc_rfc3339),
            last_error: status.last_error,
        });

    Ok(Json(ConnectionResponse {
        connected: true,
        provider: connection.provider,
        external_user_id: connection.external_user_id,
        scopes: connection.scopes,
        connected_at: Some(format_utc_rfc3339(connection.created_at)),
        sync,
    }))
}

// ─── Disconnect ──────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DisconnectResponse {
    pub success: bool,
    pub message: String,
}

/// Remove the caller's WHOOP connection and sync status.
///
/// Already-synced records are kept.
async fn delete_connection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DisconnectResponse>> {
    if !state.whoop.disconnect(&user.user_id).await? {
        return Err(AppError::NoConnection);
    }

    Ok(Json(DisconnectResponse {
        success: true,
        message: "WHOOP disconnected".to_string(),
    }))
}
