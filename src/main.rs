// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vitals-Sync API Server
//!
//! Connects WHOOP accounts over OAuth and keeps recovery, sleep and workout
//! records in sync from the scheduler, the dashboard and WHOOP webhooks.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitals_sync::{
    config::Config,
    db::{FirestoreDb, HealthStore, MemoryStore},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment; bad key or missing credentials are fatal
    let config = Config::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
    })?;
    tracing::info!(
        port = config.port,
        environment = ?config.environment,
        "Starting Vitals-Sync API"
    );

    // Construct the store once and inject it everywhere
    let store: Arc<dyn HealthStore> = if config.use_memory_store() {
        tracing::warn!("No GCP project configured, using in-memory store (data is not persisted)");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FirestoreDb::new(&config.gcp_project_id).await?)
    };

    if config.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET not set, scheduled sync endpoint will reject all calls");
    }
    if config.webhook_secret.is_none() && config.enforce_webhook_signatures() {
        tracing::warn!("WHOOP_WEBHOOK_SECRET not set, webhooks will be rejected");
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store)?);

    // Build router
    let app = vitals_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vitals_sync=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
