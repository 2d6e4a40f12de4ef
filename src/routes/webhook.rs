// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for WHOOP events.
//!
//! WHOOP retries anything that is not a 2xx, so only a bad signature (401) or
//! a genuinely unexpected failure (500) is reported as an error. Unknown users,
//! unhandled event types and unscored records are all acknowledged.

use crate::error::AppError;
use crate::services::triggers::{handle_webhook_event, WebhookEvent, WebhookOutcome};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-whoop-signature";

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhooks/whoop", post(handle_event))
}

/// Acknowledgement body.
#[derive(Serialize)]
struct WebhookAck {
    received: bool,
}

/// Check a hex HMAC-SHA256 signature over `body` in constant time.
pub fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Handle incoming webhook event (POST).
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if state.config.enforce_webhook_signatures() {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok());
        let valid = match (state.config.webhook_secret.as_deref(), signature) {
            (Some(secret), Some(signature)) => {
                verify_signature(secret.as_bytes(), &body, signature)
            }
            _ => false,
        };

        if !valid {
            tracing::warn!(
                has_signature = signature.is_some(),
                "Rejected webhook with invalid signature"
            );
            return AppError::Signature.into_response();
        }
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed webhook payload");
            return AppError::BadRequest("Malformed webhook payload".to_string()).into_response();
        }
    };

    tracing::info!(
        event_type = %event.event_type,
        whoop_user_id = %event.user_id,
        object_id = %event.id,
        trace_id = event.trace_id.as_deref().unwrap_or(""),
        "Received webhook event"
    );

    match handle_webhook_event(&state.sync_engine, &event).await {
        Ok(outcome) => {
            if outcome != WebhookOutcome::UnknownUser {
                tracing::debug!(?outcome, "Webhook event handled");
            }
            Json(WebhookAck { received: true }).into_response()
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                event_type = %event.event_type,
                "Webhook processing failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Processing failed" })),
            )
                .into_response()
        }
    }
}
