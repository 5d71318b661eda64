//! Webhook delivery queue.
//!
//! Provides an abstraction for scheduling webhook delivery outside the
//! emitting request. The actual implementation is provided by the queue crate.

use async_trait::async_trait;
use pingfox_common::AppResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Everything a worker needs to deliver one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTask {
    /// ID of the stored event.
    pub event_id: String,
    /// Tenant endpoint to POST to.
    pub webhook_url: String,
    /// Tenant HMAC key.
    pub secret: String,
}

/// Trait for scheduling webhook deliveries.
///
/// This allows the dispatcher to schedule deliveries without directly
/// depending on the queue implementation.
#[async_trait]
pub trait WebhookQueue: Send + Sync {
    /// Schedule one delivery task.
    ///
    /// Errors mean the task was not scheduled and must reach the caller.
    async fn queue_delivery(&self, task: DeliveryTask) -> AppResult<()>;

    /// Schedule a task again, to run no earlier than `delay` from now.
    async fn queue_retry(&self, task: DeliveryTask, delay: Duration) -> AppResult<()>;
}

/// Type alias for a shared webhook queue.
pub type WebhookQueueService = Arc<dyn WebhookQueue>;

/// A no-op implementation of `WebhookQueue` for when delivery is disabled.
#[derive(Clone, Default)]
pub struct NoOpWebhookQueue;

#[async_trait]
impl WebhookQueue for NoOpWebhookQueue {
    async fn queue_delivery(&self, task: DeliveryTask) -> AppResult<()> {
        tracing::debug!(event_id = %task.event_id, "Webhook delivery disabled, not queueing");
        Ok(())
    }

    async fn queue_retry(&self, task: DeliveryTask, _delay: Duration) -> AppResult<()> {
        tracing::debug!(event_id = %task.event_id, "Webhook delivery disabled, not retrying");
        Ok(())
    }
}
