// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. A missing OAuth client credential or a
//! malformed token encryption key is fatal: the process refuses to start rather
//! than failing on the first sync.

use std::env;

/// Default WHOOP developer API base.
pub const DEFAULT_WHOOP_API_BASE: &str = "https://api.prod.whoop.com/developer";

/// Default WHOOP OAuth base (authorize and token endpoints live under it).
pub const DEFAULT_WHOOP_OAUTH_BASE: &str = "https://api.prod.whoop.com/oauth/oauth2";

/// Provider name used as the `provider` key on connections and sync status.
pub const PROVIDER_WHOOP: &str = "whoop";

/// Project ID used when `GCP_PROJECT_ID` is unset.
pub const LOCAL_PROJECT_ID: &str = "local-dev";

/// Deployment environment. Webhook signatures are only optional in development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Environment::Development,
            _ => Environment::Production,
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// WHOOP OAuth client ID (public)
    pub whoop_client_id: String,
    /// Redirect URI registered with WHOOP for the OAuth callback
    pub whoop_redirect_uri: String,
    /// WHOOP API base URL (overridable for testing)
    pub whoop_api_base: String,
    /// WHOOP OAuth base URL (overridable for testing)
    pub whoop_oauth_base: String,
    /// Dashboard URL that OAuth results are redirected to
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Deployment environment
    pub environment: Environment,

    // --- Secrets ---
    /// WHOOP OAuth client secret
    pub whoop_client_secret: String,
    /// Shared secret the scheduler presents as a bearer token
    pub cron_secret: Option<String>,
    /// Shared secret for webhook HMAC signatures
    pub webhook_secret: Option<String>,
    /// AES-256 key for OAuth tokens at rest (exactly 32 bytes)
    pub token_encryption_key: [u8; 32],
    /// HS256 secret of the external auth service (dashboard sessions)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Config for testing only.
    pub fn test_default() -> Self {
        Self {
            whoop_client_id: "test_client_id".to_string(),
            whoop_redirect_uri: "http://localhost:8080/auth/whoop/callback".to_string(),
            whoop_api_base: DEFAULT_WHOOP_API_BASE.to_string(),
            whoop_oauth_base: DEFAULT_WHOOP_OAUTH_BASE.to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            environment: Environment::Production,
            whoop_client_secret: "test_secret".to_string(),
            cron_secret: Some("test_cron_secret".to_string()),
            webhook_secret: Some("test_webhook_secret".to_string()),
            token_encryption_key: [7u8; 32],
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = required("AUTH_JWT_SECRET")?.into_bytes();
        let oauth_state_key = optional("OAUTH_STATE_KEY")
            .map(String::into_bytes)
            .unwrap_or_else(|| jwt_signing_key.clone());

        Ok(Self {
            whoop_client_id: required("WHOOP_CLIENT_ID")?,
            whoop_redirect_uri: required("WHOOP_REDIRECT_URI")?,
            whoop_api_base: optional("WHOOP_API_BASE")
                .unwrap_or_else(|| DEFAULT_WHOOP_API_BASE.to_string()),
            whoop_oauth_base: optional("WHOOP_OAUTH_BASE")
                .unwrap_or_else(|| DEFAULT_WHOOP_OAUTH_BASE.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: optional("GCP_PROJECT_ID")
                .unwrap_or_else(|| LOCAL_PROJECT_ID.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            environment: Environment::parse(
                &env::var("APP_ENV").unwrap_or_else(|_| "production".to_string()),
            ),

            whoop_client_secret: required("WHOOP_CLIENT_SECRET")?,
            cron_secret: optional("CRON_SECRET"),
            webhook_secret: optional("WHOOP_WEBHOOK_SECRET"),
            token_encryption_key: parse_encryption_key(&required("TOKEN_ENCRYPTION_KEY")?)?,
            jwt_signing_key,
            oauth_state_key,
        })
    }

    /// Local development without a Firestore project or emulator.
    pub fn use_memory_store(&self) -> bool {
        self.environment == Environment::Development
            && self.gcp_project_id == LOCAL_PROJECT_ID
            && env::var("FIRESTORE_EMULATOR_HOST").is_err()
    }

    /// Whether webhook signatures must be verified.
    pub fn enforce_webhook_signatures(&self) -> bool {
        self.environment != Environment::Development
    }

    /// WHOOP authorization endpoint.
    pub fn whoop_auth_url(&self) -> String {
        format!("{}/auth", self.whoop_oauth_base.trim_end_matches('/'))
    }

    /// WHOOP token endpoint.
    pub fn whoop_token_url(&self) -> String {
        format!("{}/token", self.whoop_oauth_base.trim_end_matches('/'))
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the hex-encoded 256-bit token encryption key.
pub fn parse_encryption_key(hex_key: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| ConfigError::InvalidKey(format!("not valid hex: {}", e)))?;

    bytes.try_into().map_err(|b: Vec<u8>| {
        ConfigError::InvalidKey(format!(
            "must be 32 bytes (64 hex characters), got {} bytes",
            b.len()
        ))
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid TOKEN_ENCRYPTION_KEY: {0}")]
    InvalidKey(String),
}
