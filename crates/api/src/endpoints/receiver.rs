//! Reference webhook receiver.
//!
//! Shows how a tenant endpoint verifies `X-PingFox-Signature` over the raw
//! request body before trusting the event.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use pingfox_common::{SIGNATURE_HEADER, verify};
use pingfox_core::WebhookPayload;
use serde_json::json;
use tracing::{info, warn};

use crate::middleware::AppState;

/// Verify and acknowledge a webhook delivery.
///
/// Rejects with 403 when the signature does not match the configured secret,
/// or when no secret is configured.
async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let verified = state
        .receiver_secret
        .as_deref()
        .is_some_and(|secret| verify(&body, signature, secret));

    if !verified {
        warn!(
            has_signature = !signature.is_empty(),
            "Rejected webhook with invalid signature"
        );
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "Invalid signature"})),
        )
            .into_response();
    }

    match serde_json::from_slice::<WebhookPayload>(&body) {
        Ok(payload) => info!(
            event_id = %payload.id,
            event_type = %payload.event_type,
            team_id = %payload.team_id,
            "Webhook received"
        ),
        Err(e) => warn!(error = %e, "Signed webhook body is not a recognized event"),
    }

    (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
}

pub fn router() -> Router<AppState> {
    Router::new().route("/receiver", post(receive_webhook))
}
