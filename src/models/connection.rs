// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! OAuth connection model (one per user and provider).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored OAuth connection. Tokens are sealed by the token vault.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthConnection {
    /// Dashboard user ID (from the external auth service)
    pub user_id: String,
    /// Provider name ("whoop")
    pub provider: String,
    /// Serialized encrypted access token
    pub access_token_encrypted: String,
    /// Serialized encrypted refresh token (absent if the grant had none)
    pub refresh_token_encrypted: Option<String>,
    /// When the access token expires
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Granted OAuth scopes
    pub scopes: Vec<String>,
    /// The provider's identifier for this user (webhooks are routed by it)
    pub external_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sealed token pair written back after a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenUpdate {
    pub access_token_encrypted: String,
    pub refresh_token_encrypted: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Stored access token the refresh started from; the write is skipped if
    /// another instance has replaced it since
    pub expected_access_token_encrypted: Option<String>,
}
