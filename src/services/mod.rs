// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod normalize;
pub mod sync;
pub mod triggers;
pub mod vault;
pub mod whoop;

pub use sync::{SyncEngine, SyncReport, SyncWindow};
pub use vault::TokenVault;
pub use whoop::{RefreshLocks, WhoopClient, WhoopService, WhoopSession};
