// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Token exchange failed ({status}): {body}")]
    TokenExchange { status: u16, body: String },

    #[error("Token refresh failed ({status}): {body}")]
    TokenRefresh { status: u16, body: String },

    #[error("WHOOP API error ({status}): {body}")]
    Request { status: u16, body: String },

    #[error("Token integrity check failed: {0}")]
    Integrity(String),

    #[error("No WHOOP connection found. Please reconnect your account.")]
    NoConnection,

    #[error("Invalid webhook signature")]
    Signature,

    #[error("A sync is already in progress")]
    SyncInProgress,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Status code used when the provider could not be reached at all.
    pub const TRANSPORT_STATUS: u16 = 0;

    /// Whether this error means the stored connection can no longer be used
    /// until the user re-authenticates.
    pub fn is_connection_broken(&self) -> bool {
        matches!(
            self,
            AppError::TokenRefresh { .. } | AppError::Integrity(_) | AppError::NoConnection
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Signature => (StatusCode::UNAUTHORIZED, "invalid_signature", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::NoConnection => (
                StatusCode::NOT_FOUND,
                "no_connection",
                Some(self.to_string()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::SyncInProgress => (StatusCode::CONFLICT, "sync_in_progress", None),
            AppError::TokenExchange { status, .. } => {
                tracing::warn!(status, "Token exchange rejected by WHOOP");
                (StatusCode::BAD_GATEWAY, "token_exchange_failed", None)
            }
            AppError::TokenRefresh { status, .. } => {
                tracing::warn!(status, "Token refresh rejected by WHOOP");
                (
                    StatusCode::BAD_GATEWAY,
                    "token_refresh_failed",
                    Some("Reconnect your WHOOP account".to_string()),
                )
            }
            AppError::Request { status, .. } => (
                StatusCode::BAD_GATEWAY,
                "whoop_error",
                Some(format!("WHOOP returned HTTP {}", status)),
            ),
            AppError::Integrity(msg) => {
                tracing::error!(error = %msg, "Token integrity error");
                (StatusCode::INTERNAL_SERVER_ERROR, "integrity_error", None)
            }
            AppError::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
