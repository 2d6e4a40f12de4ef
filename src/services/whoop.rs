// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP API client for OAuth and paginated health data.
//!
//! Handles:
//! - Authorization URL construction and code exchange
//! - Bearer requests with a single refresh-and-retry on 401
//! - Refreshed tokens sealed and written back to the store
//! - Paginated recovery, sleep, workout and cycle collections

use crate::config::{Config, PROVIDER_WHOOP};
use crate::db::HealthStore;
use crate::error::AppError;
use crate::models::connection::TokenUpdate;
use crate::models::{OAuthConnection, SyncStatus};
use crate::services::vault::{self, TokenVault};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Scopes requested on every authorization. `offline` is what gets us a refresh token.
pub const WHOOP_SCOPES: [&str; 7] = [
    "offline",
    "read:profile",
    "read:recovery",
    "read:cycles",
    "read:sleep",
    "read:workout",
    "read:body_measurement",
];

/// Upper bound on pages pulled by one `fetch_all_pages` call.
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Records requested per page (WHOOP maximum).
const PAGE_LIMIT: u32 = 25;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// WHOOP HTTP client (no per-user state).
#[derive(Clone)]
pub struct WhoopClient {
    http: reqwest::Client,
    api_base: String,
    auth_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl WhoopClient {
    /// Create a new WHOOP client with OAuth credentials.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.whoop_api_base.trim_end_matches('/').to_string(),
            auth_url: config.whoop_auth_url(),
            token_url: config.whoop_token_url(),
            client_id: config.whoop_client_id.clone(),
            client_secret: config.whoop_client_secret.clone(),
            redirect_uri: config.whoop_redirect_uri.clone(),
        }
    }

    /// Build the authorization redirect URL for the given CSRF state.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&WHOOP_SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::TokenExchange {
                status: AppError::TRANSPORT_STATUS,
                body: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, body = %body, "WHOOP token exchange failed");
            return Err(AppError::TokenExchange { status, body });
        }

        response.json().await.map_err(|e| AppError::TokenExchange {
            status: 200,
            body: format!("Failed to parse token response: {}", e),
        })
    }

    /// Redeem a refresh token.
    pub async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", "offline"),
            ])
            .send()
            .await
            .map_err(|e| AppError::TokenRefresh {
                status: AppError::TRANSPORT_STATUS,
                body: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, body = %body, "WHOOP token refresh failed");
            return Err(AppError::TokenRefresh { status, body });
        }

        response.json().await.map_err(|e| AppError::TokenRefresh {
            status: 200,
            body: format!("Failed to parse refresh response: {}", e),
        })
    }

    /// Send one authenticated GET.
    async fn send_get(
        &self,
        access_token: &str,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, AppError> {
        self.http
            .get(format!("{}{}", self.api_base, endpoint))
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Request {
                status: AppError::TRANSPORT_STATUS,
                body: e.to_string(),
            })
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status == 429 {
            tracing::warn!("WHOOP rate limit hit (429)");
        }
        return Err(AppError::Request { status, body });
    }

    let status = response.status().as_u16();
    response.json().await.map_err(|e| AppError::Request {
        status,
        body: format!("JSON parse error: {}", e),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Pagination
// ─────────────────────────────────────────────────────────────────────────────

/// Date bounds and continuation token for one page request.
#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub next_token: Option<String>,
}

impl PageQuery {
    pub fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            next_token: None,
        }
    }

    /// Same bounds, different continuation token.
    pub fn with_token(&self, next_token: Option<String>) -> Self {
        Self {
            next_token,
            ..self.clone()
        }
    }

    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(start) = self.start {
            params.push(("start", crate::time_utils::format_utc_rfc3339_millis(start)));
        }
        if let Some(end) = self.end {
            params.push(("end", crate::time_utils::format_utc_rfc3339_millis(end)));
        }
        if let Some(token) = &self.next_token {
            params.push(("nextToken", token.clone()));
        }
        params
    }
}

/// One page of a collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    #[serde(default, alias = "nextToken")]
    pub next_token: Option<String>,
}

/// Records gathered by [`fetch_all_pages`].
#[derive(Debug, Clone)]
pub struct Collected<T> {
    pub records: Vec<T>,
    /// Continuation token left unfollowed because the page cap was reached
    pub deferred: Option<String>,
}

/// Drive a paginated getter until the provider stops returning a continuation
/// token or `max_pages` pages have been fetched, whichever comes first.
///
/// A cap of zero fetches nothing.
pub async fn fetch_all_pages<T, F, Fut>(mut fetcher: F, max_pages: usize) -> Result<Collected<T>, AppError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, AppError>>,
{
    let mut records = Vec::new();
    let mut next_token: Option<String> = None;
    let mut pages = 0usize;

    while pages < max_pages {
        let page = fetcher(next_token.take()).await?;
        records.extend(page.records);
        pages += 1;

        next_token = page.next_token.filter(|t| !t.is_empty());
        if next_token.is_none() {
            break;
        }
    }

    if next_token.is_some() {
        tracing::warn!(pages, "Pagination cap reached, remaining pages deferred");
    }

    Ok(Collected {
        records,
        deferred: next_token,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// WhoopService - token lifecycle around the client
// ─────────────────────────────────────────────────────────────────────────────

/// Shared refresh locks, keyed by user ID.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// High-level WHOOP service: builds per-user sessions from stored credentials
/// and owns the OAuth connect/disconnect lifecycle.
#[derive(Clone)]
pub struct WhoopService {
    client: WhoopClient,
    store: Arc<dyn HealthStore>,
    vault: TokenVault,
    /// Per-user mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl WhoopService {
    pub fn new(
        client: WhoopClient,
        store: Arc<dyn HealthStore>,
        vault: TokenVault,
        refresh_locks: RefreshLocks,
    ) -> Self {
        Self {
            client,
            store,
            vault,
            refresh_locks,
        }
    }

    pub fn client(&self) -> &WhoopClient {
        &self.client
    }

    /// Open a session for a user from stored credentials.
    ///
    /// Missing connection is [`AppError::NoConnection`]; undecryptable tokens are
    /// [`AppError::Integrity`]. Tokens already past the refresh margin are
    /// refreshed before the session is handed out.
    pub async fn session_for_user(&self, user_id: &str) -> Result<WhoopSession, AppError> {
        let connection = self
            .store
            .get_connection(user_id, PROVIDER_WHOOP)
            .await?
            .ok_or(AppError::NoConnection)?;

        let (access_token, refresh_token) = vault::decrypt_tokens(
            &self.vault,
            &connection.access_token_encrypted,
            connection.refresh_token_encrypted.as_deref(),
        )?;

        let session = WhoopSession {
            service: self.clone(),
            user_id: user_id.to_string(),
            tokens: Mutex::new(SessionTokens {
                access_token,
                refresh_token,
                stored_access_encrypted: Some(connection.access_token_encrypted.clone()),
            }),
        };

        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        if let Some(expires_at) = connection.token_expires_at {
            if Utc::now() + margin >= expires_at {
                tracing::info!(user_id, "Access token expiring, refreshing before use");
                session.refresh_access_token().await?;
            }
        }

        Ok(session)
    }

    /// Session over tokens that are not (yet) stored.
    pub fn session_from_tokens(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        user_id: &str,
    ) -> WhoopSession {
        WhoopSession {
            service: self.clone(),
            user_id: user_id.to_string(),
            tokens: Mutex::new(SessionTokens {
                access_token,
                refresh_token,
                stored_access_encrypted: None,
            }),
        }
    }

    // ─── OAuth Callback Handling ─────────────────────────────────────────────

    /// Exchange the code, fetch the profile, and persist the connection plus an
    /// initial sync status.
    pub async fn connect(&self, user_id: &str, code: &str) -> Result<OAuthConnection, AppError> {
        let tokens = self.client.exchange_code(code).await?;

        let session = self.session_from_tokens(
            tokens.access_token.clone(),
            tokens.refresh_token.clone(),
            user_id,
        );
        let profile = session.get_profile().await?;

        let (access_encrypted, refresh_encrypted) = vault::encrypt_tokens(
            &self.vault,
            &tokens.access_token,
            tokens.refresh_token.as_deref(),
        )?;

        let now = Utc::now();
        let existing = self.store.get_connection(user_id, PROVIDER_WHOOP).await?;
        let connection = OAuthConnection {
            user_id: user_id.to_string(),
            provider: PROVIDER_WHOOP.to_string(),
            access_token_encrypted: access_encrypted,
            refresh_token_encrypted: refresh_encrypted,
            token_expires_at: Some(tokens.expires_at(now)),
            scopes: tokens.scopes(),
            external_user_id: Some(profile.user_id.to_string()),
            created_at: existing.map(|c| c.created_at).unwrap_or(now),
            updated_at: now,
        };

        self.store.upsert_connection(&connection).await?;
        self.store
            .init_sync_status(&SyncStatus::new(user_id, PROVIDER_WHOOP, now))
            .await?;

        tracing::info!(
            user_id,
            external_user_id = %profile.user_id,
            "WHOOP connected, tokens stored"
        );

        Ok(connection)
    }

    /// Remove the connection and its sync status.
    pub async fn disconnect(&self, user_id: &str) -> Result<bool, AppError> {
        let removed = self.store.delete_connection(user_id, PROVIDER_WHOOP).await?;
        tracing::info!(user_id, removed, "WHOOP disconnected");
        Ok(removed)
    }

    fn refresh_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

struct SessionTokens {
    access_token: String,
    refresh_token: Option<String>,
    /// Stored ciphertext the access token was loaded from, for race detection.
    stored_access_encrypted: Option<String>,
}

/// WHOOP API access on behalf of one user.
pub struct WhoopSession {
    service: WhoopService,
    user_id: String,
    tokens: Mutex<SessionTokens>,
}

impl WhoopSession {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn access_token(&self) -> String {
        self.tokens.lock().await.access_token.clone()
    }

    /// Redeem the refresh token, persist the new sealed pair and expiry, then
    /// swap the in-memory tokens.
    ///
    /// If another task refreshed while we waited for the per-user lock, the
    /// stored pair is adopted instead of spending the (now rotated) refresh token.
    pub async fn refresh_access_token(&self) -> Result<(), AppError> {
        let lock = self.service.refresh_lock(&self.user_id);
        let _guard = lock.lock().await;

        let mut tokens = self.tokens.lock().await;

        if let Some(loaded) = &tokens.stored_access_encrypted {
            if let Some(current) = self
                .service
                .store
                .get_connection(&self.user_id, PROVIDER_WHOOP)
                .await?
            {
                if &current.access_token_encrypted != loaded {
                    tracing::info!(
                        user_id = %self.user_id,
                        "Tokens refreshed concurrently, adopting stored pair"
                    );
                    let (access, refresh) = vault::decrypt_tokens(
                        &self.service.vault,
                        &current.access_token_encrypted,
                        current.refresh_token_encrypted.as_deref(),
                    )?;
                    tokens.access_token = access;
                    tokens.refresh_token = refresh;
                    tokens.stored_access_encrypted = Some(current.access_token_encrypted);
                    return Ok(());
                }
            }
        }

        let refresh_token = tokens.refresh_token.clone().ok_or(AppError::TokenRefresh {
            status: AppError::TRANSPORT_STATUS,
            body: "no refresh token stored".to_string(),
        })?;

        let new_tokens = self.service.client.refresh_grant(&refresh_token).await?;
        // Providers that do not rotate refresh tokens omit it
        let new_refresh = new_tokens.refresh_token.clone().or(Some(refresh_token));

        let (access_encrypted, refresh_encrypted) = vault::encrypt_tokens(
            &self.service.vault,
            &new_tokens.access_token,
            new_refresh.as_deref(),
        )?;

        let update = TokenUpdate {
            access_token_encrypted: access_encrypted.clone(),
            refresh_token_encrypted: refresh_encrypted,
            token_expires_at: Some(new_tokens.expires_at(Utc::now())),
            expected_access_token_encrypted: tokens.stored_access_encrypted.clone(),
        };
        let persisted = self
            .service
            .store
            .update_connection_tokens(&self.user_id, PROVIDER_WHOOP, &update)
            .await?;

        tokens.access_token = new_tokens.access_token;
        tokens.refresh_token = new_refresh;
        if persisted {
            tokens.stored_access_encrypted = Some(access_encrypted);
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                "Stored tokens changed during refresh, new pair kept for this session only"
            );
        }

        tracing::info!(user_id = %self.user_id, persisted, "Access token refreshed");
        Ok(())
    }

    /// Authenticated GET against the WHOOP API.
    ///
    /// A 401 triggers exactly one refresh and retry. A second 401 or any other
    /// non-2xx is returned as [`AppError::Request`].
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let token = self.access_token().await;
        let mut response = self.service.client.send_get(&token, endpoint, query).await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            tracing::info!(user_id = %self.user_id, endpoint, "Access token rejected, refreshing once");
            self.refresh_access_token().await?;
            let token = self.access_token().await;
            response = self.service.client.send_get(&token, endpoint, query).await?;
        }

        check_response_json(response).await
    }

    /// Get the authenticated user's basic profile.
    pub async fn get_profile(&self) -> Result<WhoopProfile, AppError> {
        self.request("/v1/user/profile/basic", &[]).await
    }

    /// Get recovery records.
    pub async fn get_recovery(&self, query: &PageQuery) -> Result<Page<Raw<WhoopRecovery>>, AppError> {
        self.request("/v1/recovery", &query.to_params()).await
    }

    /// Get sleep records.
    pub async fn get_sleep(&self, query: &PageQuery) -> Result<Page<Raw<WhoopSleep>>, AppError> {
        self.request("/v1/activity/sleep", &query.to_params()).await
    }

    /// Get workout records.
    pub async fn get_workouts(&self, query: &PageQuery) -> Result<Page<Raw<WhoopWorkout>>, AppError> {
        self.request("/v1/activity/workout", &query.to_params()).await
    }

    /// Get physiological cycles (day strain).
    pub async fn get_cycles(&self, query: &PageQuery) -> Result<Page<Raw<WhoopCycle>>, AppError> {
        self.request("/v1/cycle", &query.to_params()).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.expires_in)
    }

    /// Granted scopes, falling back to the requested set.
    pub fn scopes(&self) -> Vec<String> {
        match &self.scope {
            Some(scope) if !scope.trim().is_empty() => {
                scope.split_whitespace().map(String::from).collect()
            }
            _ => WHOOP_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Provider identifier, numeric in v1 payloads and a UUID string in v2.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ExternalId(pub String);

impl<'de> Deserialize<'de> for ExternalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Signed(i64),
            Unsigned(u64),
            Text(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Signed(n) => ExternalId(n.to_string()),
            Repr::Unsigned(n) => ExternalId(n.to_string()),
            Repr::Text(s) => ExternalId(s),
        })
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed record plus the untouched provider payload it came from.
#[derive(Debug, Clone)]
pub struct Raw<T> {
    pub record: T,
    pub raw: serde_json::Value,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Raw<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let record = T::deserialize(&raw).map_err(D::Error::custom)?;
        Ok(Raw { record, raw })
    }
}

/// Provider scoring state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreState {
    Scored,
    PendingScore,
    Unscorable,
    #[serde(other)]
    Unknown,
}

/// Basic user profile.
#[derive(Debug, Clone, Deserialize)]
pub struct WhoopProfile {
    pub user_id: ExternalId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Recovery record (keyed by its cycle).
#[derive(Debug, Clone, Deserialize)]
pub struct WhoopRecovery {
    pub cycle_id: ExternalId,
    #[serde(default)]
    pub sleep_id: Option<ExternalId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub score_state: ScoreState,
    #[serde(default)]
    pub score: Option<WhoopRecoveryScore>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhoopRecoveryScore {
    #[serde(default)]
    pub user_calibrating: Option<bool>,
    pub recovery_score: f64,
    #[serde(default)]
    pub resting_heart_rate: Option<f64>,
    #[serde(default)]
    pub hrv_rmssd_milli: Option<f64>,
    #[serde(default)]
    pub spo2_percentage: Option<f64>,
    #[serde(default)]
    pub skin_temp_celsius: Option<f64>,
}

/// Sleep activity.
#[derive(Debug, Clone, Deserialize)]
pub struct WhoopSleep {
    pub id: ExternalId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub nap: Option<bool>,
    pub score_state: ScoreState,
    #[serde(default)]
    pub score: Option<WhoopSleepScore>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhoopSleepScore {
    pub stage_summary: WhoopStageSummary,
    #[serde(default)]
    pub respiratory_rate: Option<f64>,
    #[serde(default)]
    pub sleep_performance_percentage: Option<f64>,
    #[serde(default)]
    pub sleep_efficiency_percentage: Option<f64>,
}

/// Sleep stage durations in milliseconds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WhoopStageSummary {
    pub total_in_bed_time_milli: i64,
    pub total_awake_time_milli: i64,
    pub total_no_data_time_milli: i64,
    pub total_light_sleep_time_milli: i64,
    pub total_slow_wave_sleep_time_milli: i64,
    pub total_rem_sleep_time_milli: i64,
    pub sleep_cycle_count: i64,
    pub disturbance_count: i64,
}

/// Workout activity.
#[derive(Debug, Clone, Deserialize)]
pub struct WhoopWorkout {
    pub id: ExternalId,
    #[serde(default)]
    pub sport_id: Option<i64>,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    pub score_state: ScoreState,
    #[serde(default)]
    pub score: Option<WhoopWorkoutScore>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhoopWorkoutScore {
    #[serde(default)]
    pub strain: Option<f64>,
    #[serde(default)]
    pub average_heart_rate: Option<i64>,
    #[serde(default)]
    pub max_heart_rate: Option<i64>,
    #[serde(default)]
    pub kilojoule: Option<f64>,
    #[serde(default)]
    pub distance_meter: Option<f64>,
}

/// Physiological cycle (one day of strain).
#[derive(Debug, Clone, Deserialize)]
pub struct WhoopCycle {
    pub id: ExternalId,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    pub score_state: ScoreState,
    #[serde(default)]
    pub score: Option<WhoopCycleScore>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhoopCycleScore {
    pub strain: f64,
    #[serde(default)]
    pub kilojoule: Option<f64>,
    #[serde(default)]
    pub average_heart_rate: Option<i64>,
    #[serde(default)]
    pub max_heart_rate: Option<i64>,
}
