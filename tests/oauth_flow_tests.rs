// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth connect flow: start redirect, state checks and callback outcomes.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use tower::ServiceExt;
use vitals_sync::config::PROVIDER_WHOOP;
use vitals_sync::db::HealthStore;
use vitals_sync::models::SyncState;
use vitals_sync::routes::auth::{create_oauth_state, verify_oauth_state};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{create_test_app, create_test_app_with_whoop, token_body};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect has a location")
        .to_str()
        .unwrap()
        .to_string()
}

/// Pull the `state` query parameter out of an authorization URL.
fn state_param(url: &str) -> String {
    let query = url.split_once('?').unwrap().1;
    let raw = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("state="))
        .expect("state parameter present");
    urlencoding::decode(raw).unwrap().into_owned()
}

#[tokio::test]
async fn test_start_redirects_to_whoop_with_signed_state() {
    let (app, state, _store) = create_test_app();
    let response = app.oneshot(get("/auth/whoop?user_id=u1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let url = location(&response);
    assert!(url.starts_with(&state.config.whoop_auth_url()));
    assert!(url.contains("scope=offline%20read%3Aprofile"));

    let oauth_state = state_param(&url);
    assert_eq!(
        verify_oauth_state(&oauth_state, &state.config.oauth_state_key, Utc::now()),
        Some("u1".to_string())
    );
}

#[tokio::test]
async fn test_start_requires_user_id() {
    for uri in ["/auth/whoop", "/auth/whoop?user_id="] {
        let (app, _state, _store) = create_test_app();
        let response = app.oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_callback_denied_by_user() {
    let (app, _state, _store) = create_test_app();
    let response = app
        .oneshot(get("/auth/whoop/callback?error=access_denied"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "http://localhost:3000/dashboard?error=oauth_denied"
    );
}

#[tokio::test]
async fn test_callback_missing_params() {
    let (app, _state, _store) = create_test_app();
    let response = app.oneshot(get("/auth/whoop/callback?code=abc")).await.unwrap();
    assert_eq!(
        location(&response),
        "http://localhost:3000/dashboard?error=missing_params"
    );
}

#[tokio::test]
async fn test_callback_rejects_tampered_state() {
    let (app, state, store) = create_test_app();
    let forged = create_oauth_state("victim", b"attacker_key", Utc::now()).unwrap();

    let response = app
        .oneshot(get(&format!("/auth/whoop/callback?code=abc&state={}", forged)))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        "http://localhost:3000/dashboard?error=invalid_state"
    );
    assert!(store.get_connection("victim", PROVIDER_WHOOP).await.unwrap().is_none());
    // Sanity: the same user with the real key would have been accepted
    let genuine = create_oauth_state("victim", &state.config.oauth_state_key, Utc::now()).unwrap();
    assert!(verify_oauth_state(&genuine, &state.config.oauth_state_key, Utc::now()).is_some());
}

#[tokio::test]
async fn test_callback_rejects_expired_state() {
    let (app, state, _store) = create_test_app();
    let stale = create_oauth_state(
        "u1",
        &state.config.oauth_state_key,
        Utc::now() - Duration::minutes(30),
    )
    .unwrap();

    let response = app
        .oneshot(get(&format!("/auth/whoop/callback?code=abc&state={}", stale)))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        "http://localhost:3000/dashboard?error=invalid_state"
    );
}

#[tokio::test]
async fn test_callback_connects_account() {
    let server = MockServer::start().await;
    let (app, state, store) = create_test_app_with_whoop(&server);

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access", "refresh")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/profile/basic"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "user_id": 10129 })))
        .expect(1)
        .mount(&server)
        .await;

    let oauth_state = create_oauth_state("u1", &state.config.oauth_state_key, Utc::now()).unwrap();
    let response = app
        .oneshot(get(&format!(
            "/auth/whoop/callback?code=auth_code&state={}",
            oauth_state
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "http://localhost:3000/dashboard?connected=whoop"
    );

    let connection = store.get_connection("u1", PROVIDER_WHOOP).await.unwrap().unwrap();
    assert_eq!(connection.external_user_id.as_deref(), Some("10129"));
    let status = store.get_sync_status("u1", PROVIDER_WHOOP).await.unwrap().unwrap();
    assert_eq!(status.sync_state, SyncState::Pending);
}

#[tokio::test]
async fn test_callback_exchange_failure() {
    let server = MockServer::start().await;
    let (app, state, store) = create_test_app_with_whoop(&server);

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let oauth_state = create_oauth_state("u1", &state.config.oauth_state_key, Utc::now()).unwrap();
    let response = app
        .oneshot(get(&format!(
            "/auth/whoop/callback?code=used_code&state={}",
            oauth_state
        )))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        "http://localhost:3000/dashboard?error=oauth_failed"
    );
    assert!(store.get_connection("u1", PROVIDER_WHOOP).await.unwrap().is_none());
}
