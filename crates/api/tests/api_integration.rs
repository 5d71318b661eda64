//! API integration tests.
//!
//! These tests drive the router with an in-memory event store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, TimeZone, Utc};
use pingfox_api::{AppState, router as api_router};
use pingfox_common::{SIGNATURE_HEADER, sign};
use pingfox_core::test_utils::MemoryEventStore;
use pingfox_db::entities::webhook_event::{self, EventType};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const RECEIVER_SECRET: &str = "s3cr3t";

fn event(
    id: &str,
    team_id: &str,
    attempts: i32,
    delivered: bool,
    age_mins: i64,
) -> webhook_event::Model {
    let noon = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
    webhook_event::Model {
        id: id.to_string(),
        event_type: EventType::FormSubmitted,
        created_at: noon - Duration::minutes(age_mins),
        team_id: team_id.to_string(),
        site_id: None,
        data: json!({"form_id": "f1"}),
        delivered,
        delivery_attempts: attempts,
        last_delivery_status: (attempts > 0).then(|| "503: unavailable".to_string()),
    }
}

async fn create_test_router() -> Router {
    let store = Arc::new(MemoryEventStore::new());
    store.seed(event("evt_new", "T1", 2, false, 0)).await;
    store.seed(event("evt_old", "T1", 5, false, 30)).await;
    store.seed(event("evt_ok", "T1", 1, true, 10)).await;
    store.seed(event("evt_pending", "T2", 0, false, 5)).await;

    let state = AppState::new(store, Some(RECEIVER_SECRET.to_string()));
    api_router().with_state(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn ids(body: &Value) -> Vec<&str> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_failed_events_newest_first() {
    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook-events/failed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(ids(&body), vec!["evt_new", "evt_old"]);
    assert_eq!(body["data"][0]["delivered"], json!(false));
    assert_eq!(body["data"][0]["delivery_attempts"], json!(2));
    assert_eq!(body["data"][0]["type"], json!("form.submitted"));
}

#[tokio::test]
async fn test_failed_events_respects_limit() {
    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook-events/failed?limit=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(ids(&body), vec!["evt_new"]);
}

#[tokio::test]
async fn test_team_events() {
    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook-events?team_id=T1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(ids(&body), vec!["evt_new", "evt_ok", "evt_old"]);
}

#[tokio::test]
async fn test_get_event() {
    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook-events/evt_ok")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["id"], json!("evt_ok"));
    assert_eq!(body["data"]["delivered"], json!(true));
    assert_eq!(body["data"]["created_at"], json!("2025-01-01T11:50:00.000000Z"));
}

#[tokio::test]
async fn test_get_missing_event_returns_not_found() {
    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook-events/evt_missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!("EVENT_NOT_FOUND"));
}

#[tokio::test]
async fn test_receiver_accepts_valid_signature() {
    let app = create_test_router().await;
    let payload = br#"{"id":"evt_1","type":"form.submitted","timestamp":"2025-01-01T00:00:00.000000Z","team_id":"T1","site_id":null,"data":{}}"#;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/receiver")
                .method("POST")
                .header("Content-Type", "application/json")
                .header(SIGNATURE_HEADER, sign(payload, RECEIVER_SECRET))
                .body(Body::from(payload.as_slice()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_receiver_rejects_wrong_secret() {
    let app = create_test_router().await;
    let payload = br#"{"id":"evt_1"}"#;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/receiver")
                .method("POST")
                .header(SIGNATURE_HEADER, sign(payload, "other"))
                .body(Body::from(payload.as_slice()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await, json!({"error": "Invalid signature"}));
}

#[tokio::test]
async fn test_receiver_rejects_missing_signature() {
    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/receiver")
                .method("POST")
                .body(Body::from(r#"{"id":"evt_1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_receiver_rejects_tampered_body() {
    let app = create_test_router().await;
    let signature = sign(br#"{"id":"evt_1"}"#, RECEIVER_SECRET);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/receiver")
                .method("POST")
                .header(SIGNATURE_HEADER, signature)
                .body(Body::from(r#"{"id":"evt_2"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_receiver_without_secret_rejects_everything() {
    let store = Arc::new(MemoryEventStore::new());
    let app = api_router().with_state(AppState::new(store, None));
    let payload = br#"{"id":"evt_1"}"#;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/receiver")
                .method("POST")
                .header(SIGNATURE_HEADER, sign(payload, ""))
                .body(Body::from(payload.as_slice()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
