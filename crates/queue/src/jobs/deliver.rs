//! Webhook delivery job.

use pingfox_core::DeliveryTask;
use serde::{Deserialize, Serialize};

/// Job to deliver a stored webhook event to a tenant endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverWebhookJob {
    /// The event to deliver.
    pub event_id: String,

    /// Tenant endpoint URL.
    pub webhook_url: String,

    /// Tenant signing secret.
    pub secret: String,
}

impl DeliverWebhookJob {
    /// Create a new deliver job.
    #[must_use]
    pub const fn new(event_id: String, webhook_url: String, secret: String) -> Self {
        Self {
            event_id,
            webhook_url,
            secret,
        }
    }
}

impl From<DeliveryTask> for DeliverWebhookJob {
    fn from(task: DeliveryTask) -> Self {
        Self::new(task.event_id, task.webhook_url, task.secret)
    }
}

impl From<DeliverWebhookJob> for DeliveryTask {
    fn from(job: DeliverWebhookJob) -> Self {
        Self {
            event_id: job.event_id,
            webhook_url: job.webhook_url,
            secret: job.secret,
        }
    }
}

impl std::fmt::Display for DeliverWebhookJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret.
        write!(f, "{} -> {}", self.event_id, self.webhook_url)
    }
}
