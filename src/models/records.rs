// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalized health records stored per user.
//!
//! Every record is keyed by `(user_id, external_id)`, where `external_id` is the
//! provider's immutable identifier. Writing the same record twice overwrites it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Record categories pulled from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    Recovery,
    Sleep,
    Workout,
    Cycle,
}

impl RecordCategory {
    /// Categories covered by scheduled and manual sync.
    pub const SYNCED: [RecordCategory; 3] = [
        RecordCategory::Recovery,
        RecordCategory::Sleep,
        RecordCategory::Workout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordCategory::Recovery => "recovery",
            RecordCategory::Sleep => "sleep",
            RecordCategory::Workout => "workout",
            RecordCategory::Cycle => "cycle",
        }
    }

    /// Map a webhook event type such as `sleep.updated` to its category.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        let (object, action) = event_type.split_once('.')?;
        if !matches!(action, "created" | "updated") {
            return None;
        }
        match object {
            "recovery" => Some(RecordCategory::Recovery),
            "sleep" => Some(RecordCategory::Sleep),
            "workout" => Some(RecordCategory::Workout),
            "cycle" => Some(RecordCategory::Cycle),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily recovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecoveryRecord {
    pub user_id: String,
    pub source: String,
    /// Provider cycle ID
    pub external_id: String,
    pub recorded_at: DateTime<Utc>,
    /// 0-100
    pub recovery_score: f64,
    /// HRV (RMSSD) in milliseconds
    pub hrv_rmssd: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub skin_temp_celsius: Option<f64>,
    /// `{"raw": <provider payload>}`
    pub metadata: serde_json::Value,
}

/// Sleep session with per-stage minutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SleepRecord {
    pub user_id: String,
    pub source: String,
    pub external_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Time in bed minus time awake
    pub total_sleep_minutes: i64,
    pub rem_minutes: i64,
    pub deep_minutes: i64,
    pub light_minutes: i64,
    pub awake_minutes: i64,
    pub sleep_score: Option<f64>,
    pub sleep_efficiency: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub metadata: serde_json::Value,
}

/// Workout session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutRecord {
    pub user_id: String,
    pub source: String,
    pub external_id: String,
    /// Provider sport code
    pub activity_type: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub strain_score: Option<f64>,
    pub avg_heart_rate: Option<i64>,
    pub max_heart_rate: Option<i64>,
    /// Kilocalories
    pub calories_burned: Option<i64>,
    pub distance_meters: Option<f64>,
    pub metadata: serde_json::Value,
}

/// Single time-series value (cycle strain).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthMetric {
    pub user_id: String,
    pub source: String,
    pub external_id: String,
    pub metric_type: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}
