//! API endpoints.

mod events;
mod receiver;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/webhook-events", events::router())
        .merge(receiver::router())
}
