// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Vitals-Sync: import WHOOP recovery, sleep and workout data
//!
//! This crate provides the backend that connects a user's WHOOP account over
//! OAuth, keeps their tokens fresh, and syncs scored health records into the
//! store from a scheduled sweep, a manual trigger, or WHOOP webhooks.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::HealthStore;
use error::AppError;
use services::{SyncEngine, TokenVault, WhoopClient, WhoopService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn HealthStore>,
    pub whoop: WhoopService,
    pub sync_engine: SyncEngine,
}

impl AppState {
    /// Wire services around an already-constructed store.
    ///
    /// Fails only if the token encryption key is unusable.
    pub fn new(config: Config, store: Arc<dyn HealthStore>) -> Result<Self, AppError> {
        let vault = TokenVault::new(&config.token_encryption_key)?;

        // Shared across every session in this process
        let refresh_locks = Arc::new(dashmap::DashMap::new());

        let whoop = WhoopService::new(
            WhoopClient::new(&config),
            store.clone(),
            vault,
            refresh_locks,
        );
        let sync_engine = SyncEngine::new(store.clone(), whoop.clone());

        Ok(Self {
            config,
            store,
            whoop,
            sync_engine,
        })
    }
}
