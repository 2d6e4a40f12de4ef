// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduled sync route, called by the platform scheduler.

use crate::error::Result;
use crate::middleware::cron_auth::require_cron_secret;
use crate::services::triggers::{run_scheduled_sweep, SweepReport};
use crate::AppState;
use axum::{extract::State, middleware, routing::get, Json, Router};
use std::sync::Arc;

/// Cron routes, guarded by the shared cron secret.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/cron/sync-worker", get(sync_worker))
        .route_layer(middleware::from_fn_with_state(state, require_cron_secret))
}

/// Sync every connected user and report per-user failures.
async fn sync_worker(State(state): State<Arc<AppState>>) -> Result<Json<SweepReport>> {
    let report = run_scheduled_sweep(&state.sync_engine).await?;
    Ok(Json(report))
}
