//! Redis-backed webhook queue.
//!
//! Implements the core `WebhookQueue` trait by pushing jobs into the
//! apalis Redis storage consumed by the deliver worker. Retries are
//! scheduled jobs in the same storage.

use async_trait::async_trait;
use chrono::Utc;
use pingfox_common::{AppError, AppResult};
use pingfox_core::{DeliveryTask, WebhookQueue};
use std::time::Duration;

use crate::jobs::DeliverWebhookJob;

/// Redis-backed webhook delivery queue.
#[derive(Clone)]
pub struct RedisWebhookQueue {
    /// Redis storage for job queue (apalis-redis).
    storage: apalis_redis::RedisStorage<DeliverWebhookJob>,
}

impl RedisWebhookQueue {
    /// Create a new Redis webhook queue.
    #[must_use]
    pub const fn new(storage: apalis_redis::RedisStorage<DeliverWebhookJob>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl WebhookQueue for RedisWebhookQueue {
    async fn queue_delivery(&self, task: DeliveryTask) -> AppResult<()> {
        use apalis::prelude::*;

        let job = DeliverWebhookJob::from(task);

        self.storage
            .clone()
            .push(job.clone())
            .await
            .map_err(|e| AppError::Queue(format!("Failed to queue webhook job: {e}")))?;

        tracing::debug!(event_id = %job.event_id, url = %job.webhook_url, "Queued webhook delivery");
        Ok(())
    }

    async fn queue_retry(&self, task: DeliveryTask, delay: Duration) -> AppResult<()> {
        use apalis::prelude::*;

        let job = DeliverWebhookJob::from(task);
        let run_at = retry_timestamp(Utc::now().timestamp(), delay);

        self.storage
            .clone()
            .schedule(job.clone(), run_at)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to schedule webhook retry: {e}")))?;

        tracing::debug!(event_id = %job.event_id, run_at = run_at, "Scheduled webhook retry");
        Ok(())
    }
}

/// Unix timestamp, in seconds, at which a retry delayed by `delay` is due.
fn retry_timestamp(now: i64, delay: Duration) -> i64 {
    now.saturating_add(i64::try_from(delay.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_timestamp() {
        assert_eq!(retry_timestamp(1_000, Duration::from_secs(60)), 1_060);
        assert_eq!(retry_timestamp(1_000, Duration::from_millis(500)), 1_000);
        assert_eq!(retry_timestamp(1_000, Duration::MAX), i64::MAX);
    }
}
