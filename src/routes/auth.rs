// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP OAuth connection routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use validator::Validate;

use crate::config::PROVIDER_WHOOP;
use crate::error::{AppError, Result};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed `state` stays valid.
pub const OAUTH_STATE_MAX_AGE_SECS: i64 = 15 * 60;

/// Tolerated clock skew for states stamped slightly in the future.
const OAUTH_STATE_SKEW_SECS: i64 = 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/whoop", get(auth_start))
        .route("/auth/whoop/callback", get(auth_callback))
}

/// Query parameters for starting OAuth flow.
#[derive(Deserialize, Validate)]
pub struct AuthStartParams {
    /// Dashboard user the connection will belong to
    #[serde(default)]
    #[validate(length(min = 1, max = 256))]
    user_id: String,
}

/// Start OAuth flow - redirect to WHOOP authorization.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
) -> Result<Redirect> {
    params
        .validate()
        .map_err(|_| AppError::BadRequest("user_id is required".to_string()))?;

    let oauth_state =
        create_oauth_state(&params.user_id, &state.config.oauth_state_key, Utc::now())?;
    let auth_url = state.whoop.client().authorization_url(&oauth_state);

    tracing::info!(user_id = %params.user_id, "Starting OAuth flow, redirecting to WHOOP");

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, store connection, back to the dashboard.
///
/// Always redirects; failures are reported as `?error=<reason>`.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let dashboard = format!("{}/dashboard", state.config.frontend_url.trim_end_matches('/'));
    let fail = |reason: &str| Redirect::temporary(&format!("{}?error={}", dashboard, reason));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from WHOOP");
        return fail("oauth_denied");
    }

    let (Some(code), Some(raw_state)) = (params.code, params.state) else {
        return fail("missing_params");
    };

    let Some(user_id) =
        verify_oauth_state(&raw_state, &state.config.oauth_state_key, Utc::now())
    else {
        tracing::warn!("Invalid, expired or tampered OAuth state parameter");
        return fail("invalid_state");
    };

    tracing::info!(user_id = %user_id, "Exchanging authorization code for tokens");

    match state.whoop.connect(&user_id, &code).await {
        Ok(_) => Redirect::temporary(&format!("{}?connected={}", dashboard, PROVIDER_WHOOP)),
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "WHOOP OAuth callback failed");
            fail("oauth_failed")
        }
    }
}

fn sign(payload: &str, secret: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Build the signed OAuth `state` for a user.
///
/// Format before base64url: `user_id|nonce_hex|timestamp_hex|signature_hex`.
pub fn create_oauth_state(user_id: &str, secret: &[u8], now: DateTime<Utc>) -> Result<String> {
    let mut nonce = [0u8; 16];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;

    let payload = format!("{}|{}|{:x}", user_id, hex::encode(nonce), now.timestamp());
    let signature = sign(&payload, secret)?.finalize().into_bytes();
    let signed_state = format!("{}|{}", payload, hex::encode(signature));

    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify the signature and age of an OAuth `state` and return its user ID.
pub fn verify_oauth_state(state: &str, secret: &[u8], now: DateTime<Utc>) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Split from the right so user IDs may contain '|'
    let mut parts = state_str.rsplitn(4, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let nonce_hex = parts.next()?;
    let user_id = parts.next()?;
    if user_id.is_empty() {
        return None;
    }

    let payload = format!("{}|{}|{}", user_id, nonce_hex, timestamp_hex);
    let signature = hex::decode(signature_hex).ok()?;
    if sign(&payload, secret).ok()?.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_at = i64::from_str_radix(timestamp_hex, 16).ok()?;
    let age = now.timestamp() - issued_at;
    if !(-OAUTH_STATE_SKEW_SECS..=OAUTH_STATE_MAX_AGE_SECS).contains(&age) {
        tracing::warn!(age_secs = age, "OAuth state outside its validity window");
        return None;
    }

    Some(user_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &[u8] = b"secret_key";

    #[test]
    fn test_state_roundtrip() {
        let now = Utc::now();
        let state = create_oauth_state("user-42", SECRET, now).unwrap();
        assert_eq!(
            verify_oauth_state(&state, SECRET, now + Duration::minutes(5)),
            Some("user-42".to_string())
        );
    }

    #[test]
    fn test_state_is_unique_per_call() {
        let now = Utc::now();
        let a = create_oauth_state("user-42", SECRET, now).unwrap();
        let b = create_oauth_state("user-42", SECRET, now).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_user_id_with_separator() {
        let now = Utc::now();
        let state = create_oauth_state("a|b", SECRET, now).unwrap();
        assert_eq!(verify_oauth_state(&state, SECRET, now), Some("a|b".to_string()));
    }

    #[test]
    fn test_state_expired() {
        let now = Utc::now();
        let state = create_oauth_state("user-42", SECRET, now).unwrap();
        assert_eq!(
            verify_oauth_state(&state, SECRET, now + Duration::minutes(16)),
            None
        );
    }

    #[test]
    fn test_state_invalid_signature() {
        let payload = format!("user-42|{}|{:x}", "00".repeat(16), Utc::now().timestamp());
        let state_data = format!("{}|{}", payload, "ab".repeat(32));
        let encoded_state = URL_SAFE_NO_PAD.encode(state_data.as_bytes());

        assert_eq!(verify_oauth_state(&encoded_state, SECRET, Utc::now()), None);
    }

    #[test]
    fn test_state_wrong_secret() {
        let now = Utc::now();
        let state = create_oauth_state("user-42", SECRET, now).unwrap();
        assert_eq!(verify_oauth_state(&state, b"other", now), None);
    }

    #[test]
    fn test_state_garbage() {
        assert_eq!(verify_oauth_state("!!!", SECRET, Utc::now()), None);
        let encoded = URL_SAFE_NO_PAD.encode(b"no-separators");
        assert_eq!(verify_oauth_state(&encoded, SECRET, Utc::now()), None);
    }
}
