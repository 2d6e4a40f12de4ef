// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod connection;
pub mod records;
pub mod sync_status;

pub use connection::OAuthConnection;
pub use records::{HealthMetric, RecordCategory, RecoveryRecord, SleepRecord, WorkoutRecord};
pub use sync_status::{SyncOutcome, SyncState, SyncStatus};
