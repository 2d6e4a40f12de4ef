// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP client and token lifecycle against a mock WHOOP server.

use chrono::{Duration, Utc};
use vitals_sync::config::PROVIDER_WHOOP;
use vitals_sync::db::HealthStore;
use vitals_sync::error::AppError;
use vitals_sync::models::SyncState;
use vitals_sync::services::whoop::{fetch_all_pages, PageQuery};
use wiremock::matchers::{body_string_contains, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{
    create_test_app_with_whoop, page, seed_connection, seed_connection_expiring, sleep_json,
    stored_tokens, token_body,
};

#[tokio::test]
async fn test_expired_access_token_refreshes_once_and_retries() {
    let server = MockServer::start().await;
    let (_app, state, store) = create_test_app_with_whoop(&server);
    seed_connection(&store, "u1", "10129", "old_access", "old_refresh").await;

    Mock::given(method("GET"))
        .and(path("/v1/activity/sleep"))
        .and(header("authorization", "Bearer old_access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/activity/sleep"))
        .and(header("authorization", "Bearer new_access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![sleep_json(1, "SCORED")], None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old_refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new_access", "new_refresh")))
        .expect(1)
        .mount(&server)
        .await;

    let session = state.whoop.session_for_user("u1").await.unwrap();
    let page = session.get_sleep(&PageQuery::default()).await.unwrap();
    assert_eq!(page.records.len(), 1);

    let (access, refresh) = stored_tokens(&store, "u1").await;
    assert_eq!(access, "new_access");
    assert_eq!(refresh.as_deref(), Some("new_refresh"));
}

#[tokio::test]
async fn test_second_401_is_a_request_error() {
    let server = MockServer::start().await;
    let (_app, state, store) = create_test_app_with_whoop(&server);
    seed_connection(&store, "u1", "10129", "old_access", "old_refresh").await;

    Mock::given(method("GET"))
        .and(path("/v1/recovery"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new_access", "new_refresh")))
        .expect(1)
        .mount(&server)
        .await;

    let session = state.whoop.session_for_user("u1").await.unwrap();
    let err = session.get_recovery(&PageQuery::default()).await.unwrap_err();
    assert!(matches!(err, AppError::Request { status: 401, .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_rejected_refresh_is_token_refresh_error() {
    let server = MockServer::start().await;
    let (_app, state, store) = create_test_app_with_whoop(&server);
    seed_connection(&store, "u1", "10129", "old_access", "old_refresh").await;

    Mock::given(method("GET"))
        .and(path("/v1/activity/workout"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let session = state.whoop.session_for_user("u1").await.unwrap();
    let err = session.get_workouts(&PageQuery::default()).await.unwrap_err();
    match err {
        AppError::TokenRefresh { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected TokenRefresh, got {:?}", other),
    }

    // Stored tokens are untouched
    let (access, _) = stored_tokens(&store, "u1").await;
    assert_eq!(access, "old_access");
}

#[tokio::test]
async fn test_token_near_expiry_is_refreshed_before_use() {
    let server = MockServer::start().await;
    let (_app, state, store) = create_test_app_with_whoop(&server);
    seed_connection_expiring(
        &store,
        "u1",
        "10129",
        "old_access",
        "old_refresh",
        Utc::now() + Duration::minutes(2),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new_access", "new_refresh")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/cycle"))
        .and(header("authorization", "Bearer new_access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let session = state.whoop.session_for_user("u1").await.unwrap();
    session.get_cycles(&PageQuery::default()).await.unwrap();

    let connection = store.get_connection("u1", PROVIDER_WHOOP).await.unwrap().unwrap();
    assert!(connection.token_expires_at.unwrap() > Utc::now() + Duration::minutes(30));
}

#[tokio::test]
async fn test_concurrent_refresh_adopts_stored_tokens() {
    let server = MockServer::start().await;
    let (_app, state, store) = create_test_app_with_whoop(&server);
    seed_connection(&store, "u1", "10129", "old_access", "old_refresh").await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new_access", "new_refresh")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/recovery"))
        .and(header("authorization", "Bearer new_access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    // Both sessions start from the same stored pair
    let first = state.whoop.session_for_user("u1").await.unwrap();
    let second = state.whoop.session_for_user("u1").await.unwrap();

    first.refresh_access_token().await.unwrap();
    // The rotated refresh token is already stored, so no second grant
    second.refresh_access_token().await.unwrap();

    second.get_recovery(&PageQuery::default()).await.unwrap();
}

#[tokio::test]
async fn test_missing_connection_is_no_connection() {
    let server = MockServer::start().await;
    let (_app, state, _store) = create_test_app_with_whoop(&server);

    let err = state.whoop.session_for_user("nobody").await.err().unwrap();
    assert!(matches!(err, AppError::NoConnection));
}

#[tokio::test]
async fn test_pagination_follows_tokens_in_order() {
    let server = MockServer::start().await;
    let (_app, state, store) = create_test_app_with_whoop(&server);
    seed_connection(&store, "u1", "10129", "access", "refresh").await;

    Mock::given(method("GET"))
        .and(path("/v1/activity/sleep"))
        .and(query_param_is_missing("nextToken"))
        .and(query_param("limit", "25"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![sleep_json(1, "SCORED"), sleep_json(2, "SCORED")], Some("p2"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/activity/sleep"))
        .and(query_param("nextToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![sleep_json(3, "SCORED")], None)))
        .expect(1)
        .mount(&server)
        .await;

    let session = state.whoop.session_for_user("u1").await.unwrap();
    let records = fetch_all_pages(
        |token| {
            let q = PageQuery::default().with_token(token);
            let session = &session;
            async move { session.get_sleep(&q).await }
        },
        10,
    )
    .await
    .unwrap();

    let ids: Vec<String> = records.records.iter().map(|r| r.record.id.0.clone()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(records.deferred, None);
}

#[tokio::test]
async fn test_pagination_stops_at_page_cap() {
    let server = MockServer::start().await;
    let (_app, state, store) = create_test_app_with_whoop(&server);
    seed_connection(&store, "u1", "10129", "access", "refresh").await;

    // Always claims there is more
    Mock::given(method("GET"))
        .and(path("/v1/activity/workout"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![common::workout_json(1, "SCORED")], Some("more"))),
        )
        .expect(3)
        .mount(&server)
        .await;

    let session = state.whoop.session_for_user("u1").await.unwrap();
    let records = fetch_all_pages(
        |token| {
            let q = PageQuery::default().with_token(token);
            let session = &session;
            async move { session.get_workouts(&q).await }
        },
        3,
    )
    .await
    .unwrap();

    assert_eq!(records.records.len(), 3);
    assert_eq!(records.deferred.as_deref(), Some("more"));
}

#[tokio::test]
async fn test_exchange_code_failure_is_token_exchange_error() {
    let server = MockServer::start().await;
    let (_app, state, _store) = create_test_app_with_whoop(&server);

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad code"))
        .expect(1)
        .mount(&server)
        .await;

    let err = state.whoop.client().exchange_code("nope").await.unwrap_err();
    match err {
        AppError::TokenExchange { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad code");
        }
        other => panic!("expected TokenExchange, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connect_stores_sealed_connection_and_pending_status() {
    let server = MockServer::start().await;
    let (_app, state, store) = create_test_app_with_whoop(&server);

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("code=auth_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access", "refresh")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/profile/basic"))
        .and(header("authorization", "Bearer access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user_id": 10129,
            "email": "jsmith@whoop.com",
            "first_name": "John",
            "last_name": "Smith"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connection = state.whoop.connect("u1", "auth_code").await.unwrap();
    assert_eq!(connection.external_user_id.as_deref(), Some("10129"));
    assert!(!connection.access_token_encrypted.contains("access"));
    assert!(connection.scopes.contains(&"read:sleep".to_string()));

    let (access, refresh) = stored_tokens(&store, "u1").await;
    assert_eq!(access, "access");
    assert_eq!(refresh.as_deref(), Some("refresh"));

    let status = store.get_sync_status("u1", PROVIDER_WHOOP).await.unwrap().unwrap();
    assert_eq!(status.sync_state, SyncState::Pending);
    assert!(status.last_successful_sync.is_none());

    let found = store
        .find_connection_by_external_user(PROVIDER_WHOOP, "10129")
        .await
        .unwrap();
    assert_eq!(found.map(|c| c.user_id), Some("u1".to_string()));
}
