//! Webhook event repository.

use std::sync::Arc;

use crate::entities::{WebhookEvent, webhook_event};
use pingfox_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::Expr,
};

/// Webhook event repository for database operations.
#[derive(Clone)]
pub struct WebhookEventRepository {
    db: Arc<DatabaseConnection>,
}

impl WebhookEventRepository {
    /// Create a new webhook event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an event by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<webhook_event::Model>> {
        WebhookEvent::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an event by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<webhook_event::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::EventNotFound(id.to_string()))
    }

    /// Insert a new event.
    pub async fn create(&self, event: webhook_event::Model) -> AppResult<webhook_event::Model> {
        self.create_in(self.db.as_ref(), event).await
    }

    /// Insert a new event on the given connection.
    ///
    /// Pass the open transaction of the triggering business write so the
    /// event commits (or rolls back) together with it.
    pub async fn create_in<C>(
        &self,
        conn: &C,
        event: webhook_event::Model,
    ) -> AppResult<webhook_event::Model>
    where
        C: ConnectionTrait,
    {
        let model = webhook_event::ActiveModel {
            id: Set(event.id),
            event_type: Set(event.event_type),
            created_at: Set(event.created_at),
            team_id: Set(event.team_id),
            site_id: Set(event.site_id),
            data: Set(event.data),
            delivered: Set(event.delivered),
            delivery_attempts: Set(event.delivery_attempts),
            last_delivery_status: Set(event.last_delivery_status),
        };

        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record the outcome of one delivery attempt.
    ///
    /// The update only applies while `delivery_attempts` still equals
    /// `expected_attempts`; it then becomes `expected_attempts + 1`.
    /// `delivered` is only ever set to true, never cleared. Returns `false`
    /// when another worker recorded an attempt first.
    pub async fn record_attempt(
        &self,
        id: &str,
        expected_attempts: i32,
        delivered: bool,
        status: &str,
    ) -> AppResult<bool> {
        let status: String = status
            .chars()
            .take(webhook_event::LAST_DELIVERY_STATUS_MAX_LEN)
            .collect();

        let mut update = WebhookEvent::update_many()
            .col_expr(
                webhook_event::Column::DeliveryAttempts,
                Expr::value(expected_attempts + 1),
            )
            .col_expr(
                webhook_event::Column::LastDeliveryStatus,
                Expr::value(status),
            );

        if delivered {
            update = update.col_expr(webhook_event::Column::Delivered, Expr::value(true));
        }

        let result = update
            .filter(webhook_event::Column::Id.eq(id))
            .filter(webhook_event::Column::DeliveryAttempts.eq(expected_attempts))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            tracing::debug!(
                event_id = %id,
                expected_attempts = expected_attempts,
                "Delivery attempt count changed concurrently"
            );
        }

        Ok(result.rows_affected == 1)
    }

    /// Find events that were attempted but never delivered, newest first.
    pub async fn find_failed(&self, limit: u64) -> AppResult<Vec<webhook_event::Model>> {
        WebhookEvent::find()
            .filter(webhook_event::Column::Delivered.eq(false))
            .filter(webhook_event::Column::DeliveryAttempts.gt(0))
            .order_by_desc(webhook_event::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the events of a team, newest first.
    pub async fn find_by_team_id(
        &self,
        team_id: &str,
        limit: u64,
    ) -> AppResult<Vec<webhook_event::Model>> {
        WebhookEvent::find()
            .filter(webhook_event::Column::TeamId.eq(team_id))
            .order_by_desc(webhook_event::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
