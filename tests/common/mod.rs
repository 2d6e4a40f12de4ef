// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use vitals_sync::config::{Config, PROVIDER_WHOOP};
use vitals_sync::db::{FirestoreDb, HealthStore, MemoryStore};
use vitals_sync::middleware::auth::create_jwt;
use vitals_sync::models::OAuthConnection;
use vitals_sync::routes::create_router;
use vitals_sync::services::vault::{decrypt_tokens, encrypt_tokens};
use vitals_sync::services::TokenVault;
use vitals_sync::AppState;
use wiremock::MockServer;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Test config whose WHOOP endpoints point at `whoop_base` (a mock server).
#[allow(dead_code)]
pub fn test_config(whoop_base: &str) -> Config {
    let mut config = Config::test_default();
    config.whoop_api_base = whoop_base.to_string();
    config.whoop_oauth_base = format!("{}/oauth", whoop_base);
    config
}

/// Build state and router over a fresh in-memory store.
#[allow(dead_code)]
pub fn create_app_with_config(config: Config) -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(
        AppState::new(config, store.clone() as Arc<dyn HealthStore>)
            .expect("test encryption key is valid"),
    );
    (create_router(state.clone()), state, store)
}

/// Test app with the default config. WHOOP is unreachable.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    create_app_with_config(test_config("http://127.0.0.1:9"))
}

/// Test app talking to a mock WHOOP server.
#[allow(dead_code)]
pub fn create_test_app_with_whoop(
    server: &MockServer,
) -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    create_app_with_config(test_config(&server.uri()))
}

/// The vault the test config encrypts with.
#[allow(dead_code)]
pub fn test_vault() -> TokenVault {
    TokenVault::new(&Config::test_default().token_encryption_key).unwrap()
}

/// Store a WHOOP connection with sealed tokens expiring at `expires_at`.
#[allow(dead_code)]
pub async fn seed_connection_expiring(
    store: &MemoryStore,
    user_id: &str,
    whoop_user_id: &str,
    access_token: &str,
    refresh_token: &str,
    expires_at: DateTime<Utc>,
) -> OAuthConnection {
    let (access, refresh) = encrypt_tokens(&test_vault(), access_token, Some(refresh_token)).unwrap();
    let now = Utc::now();
    let connection = OAuthConnection {
        user_id: user_id.to_string(),
        provider: PROVIDER_WHOOP.to_string(),
        access_token_encrypted: access,
        refresh_token_encrypted: refresh,
        token_expires_at: Some(expires_at),
        scopes: vec!["offline".to_string(), "read:sleep".to_string()],
        external_user_id: Some(whoop_user_id.to_string()),
        created_at: now,
        updated_at: now,
    };
    store.upsert_connection(&connection).await.unwrap();
    connection
}

/// Store a WHOOP connection whose access token is good for another hour.
#[allow(dead_code)]
pub async fn seed_connection(
    store: &MemoryStore,
    user_id: &str,
    whoop_user_id: &str,
    access_token: &str,
    refresh_token: &str,
) -> OAuthConnection {
    seed_connection_expiring(
        store,
        user_id,
        whoop_user_id,
        access_token,
        refresh_token,
        Utc::now() + Duration::hours(1),
    )
    .await
}

/// Decrypt the stored token pair for a user.
#[allow(dead_code)]
pub async fn stored_tokens(store: &MemoryStore, user_id: &str) -> (String, Option<String>) {
    let connection = store
        .get_connection(user_id, PROVIDER_WHOOP)
        .await
        .unwrap()
        .expect("connection exists");
    decrypt_tokens(
        &test_vault(),
        &connection.access_token_encrypted,
        connection.refresh_token_encrypted.as_deref(),
    )
    .unwrap()
}

/// Session JWT as issued by the external auth service.
#[allow(dead_code)]
pub fn session_token(user_id: &str) -> String {
    create_jwt(user_id, &Config::test_default().jwt_signing_key, 3600).unwrap()
}

/// Hex HMAC-SHA256 of a webhook body under the test webhook secret.
#[allow(dead_code)]
pub fn sign_webhook(body: &[u8]) -> String {
    let secret = Config::test_default().webhook_secret.unwrap();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

// ─── WHOOP payload fixtures ──────────────────────────────────

#[allow(dead_code)]
pub fn page(records: Vec<Value>, next_token: Option<&str>) -> Value {
    json!({ "records": records, "next_token": next_token })
}

#[allow(dead_code)]
pub fn token_body(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_in": 3600,
        "token_type": "bearer",
        "scope": "offline read:recovery read:sleep read:workout"
    })
}

#[allow(dead_code)]
pub fn recovery_json(cycle_id: i64, score_state: &str) -> Value {
    let score = (score_state == "SCORED").then(|| {
        json!({
            "user_calibrating": false,
            "recovery_score": 44.0,
            "resting_heart_rate": 64.0,
            "hrv_rmssd_milli": 31.8,
            "spo2_percentage": 95.6,
            "skin_temp_celsius": 33.7
        })
    });
    json!({
        "cycle_id": cycle_id,
        "sleep_id": 10235,
        "user_id": 10129,
        "created_at": "2026-10-10T11:25:44.774Z",
        "updated_at": "2026-10-10T14:25:44.774Z",
        "score_state": score_state,
        "score": score
    })
}

#[allow(dead_code)]
pub fn sleep_json(id: i64, score_state: &str) -> Value {
    let score = (score_state == "SCORED").then(|| {
        json!({
            "stage_summary": {
                "total_in_bed_time_milli": 30_272_735,
                "total_awake_time_milli": 1_403_507,
                "total_no_data_time_milli": 0,
                "total_light_sleep_time_milli": 14_905_851,
                "total_slow_wave_sleep_time_milli": 6_630_370,
                "total_rem_sleep_time_milli": 5_879_573,
                "sleep_cycle_count": 3,
                "disturbance_count": 12
            },
            "respiratory_rate": 16.1,
            "sleep_performance_percentage": 98.0,
            "sleep_efficiency_percentage": 91.7
        })
    });
    json!({
        "id": id,
        "user_id": 10129,
        "start": "2026-10-09T22:25:44.774Z",
        "end": "2026-10-10T06:50:44.774Z",
        "nap": false,
        "score_state": score_state,
        "score": score
    })
}

#[allow(dead_code)]
pub fn workout_json(id: i64, score_state: &str) -> Value {
    let score = (score_state == "SCORED").then(|| {
        json!({
            "strain": 8.2463,
            "average_heart_rate": 123,
            "max_heart_rate": 146,
            "kilojoule": 1569.34,
            "distance_meter": 1772.77
        })
    });
    json!({
        "id": id,
        "user_id": 10129,
        "sport_id": 1,
        "start": "2026-10-10T02:25:44.774Z",
        "end": "2026-10-10T03:25:44.774Z",
        "score_state": score_state,
        "score": score
    })
}

#[allow(dead_code)]
pub fn cycle_json(id: i64, score_state: &str) -> Value {
    let score = (score_state == "SCORED").then(|| {
        json!({
            "strain": 5.2951,
            "kilojoule": 8288.3,
            "average_heart_rate": 68,
            "max_heart_rate": 141
        })
    });
    json!({
        "id": id,
        "user_id": 10129,
        "start": "2026-10-09T22:25:44.774Z",
        "end": null,
        "score_state": score_state,
        "score": score
    })
}
