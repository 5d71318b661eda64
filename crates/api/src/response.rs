//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pingfox_db::entities::webhook_event;
use serde::Serialize;
use serde_json::Value;

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// A recorded webhook event with its delivery state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookEventResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_at: String,
    pub team_id: String,
    pub site_id: Option<String>,
    pub data: Value,
    pub delivered: bool,
    pub delivery_attempts: i32,
    pub last_delivery_status: Option<String>,
}

impl From<webhook_event::Model> for WebhookEventResponse {
    fn from(event: webhook_event::Model) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type.to_string(),
            created_at: pingfox_core::payload::format_timestamp(event.created_at),
            team_id: event.team_id,
            site_id: event.site_id,
            data: event.data,
            delivered: event.delivered,
            delivery_attempts: event.delivery_attempts,
            last_delivery_status: event.last_delivery_status,
        }
    }
}
