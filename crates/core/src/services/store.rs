//! Webhook event storage.
//!
//! The dispatcher only needs a handful of operations on event records; they
//! are expressed as a trait so the storage handle can be injected.

use async_trait::async_trait;
use pingfox_common::AppResult;
use pingfox_db::entities::webhook_event;
use pingfox_db::repositories::WebhookEventRepository;
use std::sync::Arc;

/// Storage operations used by the webhook dispatcher.
#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    /// Persist a new event.
    async fn insert(&self, event: webhook_event::Model) -> AppResult<webhook_event::Model>;

    /// Load an event by ID.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<webhook_event::Model>>;

    /// Record one delivery attempt if the attempt count is still `expected_attempts`.
    ///
    /// Returns `false` when the count changed underneath the caller.
    async fn record_attempt(
        &self,
        id: &str,
        expected_attempts: i32,
        delivered: bool,
        status: &str,
    ) -> AppResult<bool>;

    /// Events that were attempted but never delivered, newest first.
    async fn find_failed(&self, limit: u64) -> AppResult<Vec<webhook_event::Model>>;

    /// Events of one team, newest first.
    async fn find_by_team(
        &self,
        team_id: &str,
        limit: u64,
    ) -> AppResult<Vec<webhook_event::Model>>;
}

/// Type alias for a shared event store.
pub type EventStore = Arc<dyn WebhookEventStore>;

#[async_trait]
impl WebhookEventStore for WebhookEventRepository {
    async fn insert(&self, event: webhook_event::Model) -> AppResult<webhook_event::Model> {
        self.create(event).await
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<webhook_event::Model>> {
        Self::find_by_id(self, id).await
    }

    async fn record_attempt(
        &self,
        id: &str,
        expected_attempts: i32,
        delivered: bool,
        status: &str,
    ) -> AppResult<bool> {
        Self::record_attempt(self, id, expected_attempts, delivered, status).await
    }

    async fn find_failed(&self, limit: u64) -> AppResult<Vec<webhook_event::Model>> {
        Self::find_failed(self, limit).await
    }

    async fn find_by_team(
        &self,
        team_id: &str,
        limit: u64,
    ) -> AppResult<Vec<webhook_event::Model>> {
        self.find_by_team_id(team_id, limit).await
    }
}
