// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trigger adapters: scheduled sweep, manual sync and webhook events.
//!
//! Each adapter only decides who to sync, over which window and which
//! categories. The work itself is done by [`SyncEngine`].

use crate::config::PROVIDER_WHOOP;
use crate::error::AppError;
use crate::models::RecordCategory;
use crate::services::sync::{RecordSyncOutcome, SyncCounts, SyncEngine, SyncWindow};
use crate::services::whoop::ExternalId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

// ─────────────────────────────────────────────────────────────────────────────
// Scheduled sweep
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate result of a sweep over all connected users.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SweepReport {
    pub message: String,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// One `"User <id>: <message>"` entry per failed user
    pub errors: Vec<String>,
}

/// Sync every connected user over the trailing window.
///
/// Users are processed sequentially and a failure for one user is recorded in
/// the report without affecting the others. Only a failure to list
/// connections is returned as an error.
pub async fn run_scheduled_sweep(engine: &SyncEngine) -> Result<SweepReport, AppError> {
    let connections = engine.store().list_connections(PROVIDER_WHOOP).await?;
    let window = SyncWindow::trailing(Utc::now());

    let mut report = SweepReport {
        message: "Sync completed".to_string(),
        total: connections.len(),
        success: 0,
        failed: 0,
        errors: Vec::new(),
    };

    tracing::info!(total = report.total, "Scheduled sweep started");

    for connection in connections {
        let user_id = connection.user_id;
        let failure = match engine
            .sync_user(&user_id, window, &RecordCategory::SYNCED)
            .await
        {
            Ok(sync) => sync.error,
            Err(e) => Some(e.to_string()),
        };

        match failure {
            None => report.success += 1,
            Some(message) => {
                report.failed += 1;
                report.errors.push(format!("User {}: {}", user_id, message));
            }
        }
    }

    tracing::info!(
        total = report.total,
        success = report.success,
        failed = report.failed,
        "Scheduled sweep finished"
    );

    Ok(report)
}

// ─────────────────────────────────────────────────────────────────────────────
// Manual sync
// ─────────────────────────────────────────────────────────────────────────────

/// Result shown to the user after a manual sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ManualSyncResult {
    pub success: bool,
    pub message: String,
}

/// Sync one user now. Never fails; errors become the message.
pub async fn manual_sync(engine: &SyncEngine, user_id: &str) -> ManualSyncResult {
    let window = SyncWindow::trailing(Utc::now());

    match engine
        .sync_user(user_id, window, &RecordCategory::SYNCED)
        .await
    {
        Ok(report) => match report.error {
            None => ManualSyncResult {
                success: true,
                message: summary_message(&report.counts),
            },
            Some(message) => ManualSyncResult {
                success: false,
                message,
            },
        },
        Err(e) => ManualSyncResult {
            success: false,
            message: e.to_string(),
        },
    }
}

fn summary_message(counts: &SyncCounts) -> String {
    format!(
        "Synced {} recovery, {} sleep, and {} workout records.",
        counts.recovery, counts.sleep, counts.workout
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhook events
// ─────────────────────────────────────────────────────────────────────────────

/// WHOOP webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    /// WHOOP user ID
    pub user_id: ExternalId,
    /// ID of the changed record (the cycle ID for recovery events)
    pub id: ExternalId,
    #[serde(default)]
    pub trace_id: Option<String>,
}

/// What a webhook event led to. All of these are acknowledged with 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// No connection for this WHOOP user
    UnknownUser,
    /// Event type we do not sync
    Ignored,
    /// The user's connection needs re-authorization; retrying cannot help
    ConnectionBroken,
    Record(RecordSyncOutcome),
}

/// Route a verified event to a single-record sync.
///
/// Errors returned here are unexpected (store or provider failures) and should
/// let WHOOP retry.
pub async fn handle_webhook_event(
    engine: &SyncEngine,
    event: &WebhookEvent,
) -> Result<WebhookOutcome, AppError> {
    let Some(connection) = engine
        .store()
        .find_connection_by_external_user(PROVIDER_WHOOP, &event.user_id.0)
        .await?
    else {
        tracing::warn!(
            whoop_user_id = %event.user_id,
            "No user found for WHOOP user ID, acknowledging"
        );
        return Ok(WebhookOutcome::UnknownUser);
    };

    let Some(category) = RecordCategory::from_event_type(&event.event_type) else {
        tracing::info!(event_type = %event.event_type, "Unhandled webhook type");
        return Ok(WebhookOutcome::Ignored);
    };

    match engine
        .sync_single_record(&connection.user_id, category, &event.id.0)
        .await
    {
        Ok(outcome) => Ok(WebhookOutcome::Record(outcome)),
        Err(e) if e.is_connection_broken() => {
            tracing::warn!(
                user_id = %connection.user_id,
                error = %e,
                "Webhook skipped, connection needs re-authorization"
            );
            Ok(WebhookOutcome::ConnectionBroken)
        }
        Err(e) => Err(e),
    }
}
