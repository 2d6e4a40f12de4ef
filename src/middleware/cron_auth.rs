// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-secret authentication for the scheduler.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Require `Authorization: Bearer <CRON_SECRET>` for `/api/cron/*` routes.
///
/// With no secret configured every call is rejected.
pub async fn require_cron_secret(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(secret) = state.config.cron_secret.as_deref() else {
        tracing::warn!("CRON_SECRET not configured, rejecting scheduled sync");
        return Err(AppError::Unauthorized);
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match presented {
        Some(token) if bool::from(token.as_bytes().ct_eq(secret.as_bytes())) => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!("Blocked scheduled sync request with invalid credentials");
            Err(AppError::Unauthorized)
        }
    }
}
