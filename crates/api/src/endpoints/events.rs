//! Webhook event audit endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use pingfox_common::{AppError, AppResult};
use serde::Deserialize;

use crate::{
    middleware::AppState,
    response::{ApiResponse, WebhookEventResponse},
};

/// Default number of events returned by list endpoints.
pub const DEFAULT_LIMIT: u64 = 50;

/// Upper bound on the number of events returned by list endpoints.
pub const MAX_LIMIT: u64 = 500;

/// Query for the failed-events listing.
#[derive(Debug, Default, Deserialize)]
pub struct FailedEventsQuery {
    pub limit: Option<u64>,
}

/// Query for the per-team listing.
#[derive(Debug, Deserialize)]
pub struct TeamEventsQuery {
    pub team_id: String,
    pub limit: Option<u64>,
}

fn clamp_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// List events that were attempted but never delivered.
async fn list_failed(
    State(state): State<AppState>,
    Query(query): Query<FailedEventsQuery>,
) -> AppResult<ApiResponse<Vec<WebhookEventResponse>>> {
    let events = state
        .event_store
        .find_failed(clamp_limit(query.limit))
        .await?;
    Ok(ApiResponse::ok(events.into_iter().map(Into::into).collect()))
}

/// List the events of a team.
async fn list_by_team(
    State(state): State<AppState>,
    Query(query): Query<TeamEventsQuery>,
) -> AppResult<ApiResponse<Vec<WebhookEventResponse>>> {
    if query.team_id.is_empty() {
        return Err(AppError::BadRequest("team_id must not be empty".to_string()));
    }

    let events = state
        .event_store
        .find_by_team(&query.team_id, clamp_limit(query.limit))
        .await?;
    Ok(ApiResponse::ok(events.into_iter().map(Into::into).collect()))
}

/// Get one event by ID.
async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<WebhookEventResponse>> {
    let event = state
        .event_store
        .find_by_id(&id)
        .await?
        .ok_or(AppError::EventNotFound(id))?;
    Ok(ApiResponse::ok(event.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_by_team))
        .route("/failed", get(list_failed))
        .route("/{id}", get(get_event))
}
