// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mapping from WHOOP payloads to stored health records.
//!
//! Every mapper returns `None` unless the provider reports the record as fully
//! scored with a score present. Callers skip `None` without writing anything, so
//! a pending record is picked up again on the next pass.

use crate::config::PROVIDER_WHOOP;
use crate::models::{HealthMetric, RecoveryRecord, SleepRecord, WorkoutRecord};
use crate::services::whoop::{Raw, ScoreState, WhoopCycle, WhoopRecovery, WhoopSleep, WhoopWorkout};
use chrono::{DateTime, Utc};
use serde_json::json;

/// Kilojoules to kilocalories.
pub const KJ_TO_KCAL: f64 = 0.239006;

/// Metric type used for a cycle's day strain.
pub const METRIC_STRAIN: &str = "strain";

pub fn millis_to_minutes(millis: i64) -> i64 {
    (millis as f64 / 60_000.0).round() as i64
}

pub fn kilojoules_to_kcal(kilojoules: f64) -> i64 {
    (kilojoules * KJ_TO_KCAL).round() as i64
}

fn metadata(raw: &serde_json::Value) -> serde_json::Value {
    json!({ "raw": raw })
}

fn scored<'a, S>(state: ScoreState, score: &'a Option<S>) -> Option<&'a S> {
    match state {
        ScoreState::Scored => score.as_ref(),
        _ => None,
    }
}

/// Recovery is keyed by its cycle ID.
///
/// `recorded_at` is the provider's creation time, or `now` for payloads without one.
pub fn map_recovery(
    user_id: &str,
    item: &Raw<WhoopRecovery>,
    now: DateTime<Utc>,
) -> Option<RecoveryRecord> {
    let recovery = &item.record;
    let score = scored(recovery.score_state, &recovery.score)?;

    Some(RecoveryRecord {
        user_id: user_id.to_string(),
        source: PROVIDER_WHOOP.to_string(),
        external_id: recovery.cycle_id.to_string(),
        recorded_at: recovery.created_at.unwrap_or(now),
        recovery_score: score.recovery_score,
        hrv_rmssd: score.hrv_rmssd_milli,
        resting_heart_rate: score.resting_heart_rate,
        spo2: score.spo2_percentage,
        skin_temp_celsius: score.skin_temp_celsius,
        metadata: metadata(&item.raw),
    })
}

/// Total sleep is time in bed minus time awake; WHOOP does not report it directly.
pub fn map_sleep(user_id: &str, item: &Raw<WhoopSleep>) -> Option<SleepRecord> {
    let sleep = &item.record;
    let score = scored(sleep.score_state, &sleep.score)?;
    let stages = &score.stage_summary;

    Some(SleepRecord {
        user_id: user_id.to_string(),
        source: PROVIDER_WHOOP.to_string(),
        external_id: sleep.id.to_string(),
        started_at: sleep.start,
        ended_at: sleep.end,
        total_sleep_minutes: millis_to_minutes(
            stages.total_in_bed_time_milli - stages.total_awake_time_milli,
        ),
        rem_minutes: millis_to_minutes(stages.total_rem_sleep_time_milli),
        deep_minutes: millis_to_minutes(stages.total_slow_wave_sleep_time_milli),
        light_minutes: millis_to_minutes(stages.total_light_sleep_time_milli),
        awake_minutes: millis_to_minutes(stages.total_awake_time_milli),
        sleep_score: score.sleep_performance_percentage,
        sleep_efficiency: score.sleep_efficiency_percentage,
        respiratory_rate: score.respiratory_rate,
        metadata: metadata(&item.raw),
    })
}

pub fn map_workout(user_id: &str, item: &Raw<WhoopWorkout>) -> Option<WorkoutRecord> {
    let workout = &item.record;
    let score = scored(workout.score_state, &workout.score)?;

    Some(WorkoutRecord {
        user_id: user_id.to_string(),
        source: PROVIDER_WHOOP.to_string(),
        external_id: workout.id.to_string(),
        activity_type: workout
            .sport_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        started_at: workout.start,
        ended_at: workout.end,
        strain_score: score.strain,
        avg_heart_rate: score.average_heart_rate,
        max_heart_rate: score.max_heart_rate,
        calories_burned: score.kilojoule.map(kilojoules_to_kcal),
        distance_meters: score.distance_meter,
        metadata: metadata(&item.raw),
    })
}

/// A cycle becomes one strain metric recorded at the cycle start.
pub fn map_cycle(user_id: &str, item: &Raw<WhoopCycle>) -> Option<HealthMetric> {
    let cycle = &item.record;
    let score = scored(cycle.score_state, &cycle.score)?;

    Some(HealthMetric {
        user_id: user_id.to_string(),
        source: PROVIDER_WHOOP.to_string(),
        external_id: cycle.id.to_string(),
        metric_type: METRIC_STRAIN.to_string(),
        value: score.strain,
        recorded_at: cycle.start,
        metadata: metadata(&item.raw),
    })
}
