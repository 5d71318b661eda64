//! Webhook deliver worker.

use apalis::prelude::*;
use pingfox_common::AppError;
use pingfox_core::WebhookDispatcher;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::jobs::DeliverWebhookJob;
use crate::retry::{DeliveryStep, RetryConfig, deliver_or_reschedule};

/// Context for the webhook deliver worker.
#[derive(Clone)]
pub struct WebhookWorkerContext {
    pub dispatcher: Arc<WebhookDispatcher>,
    pub retry: RetryConfig,
}

impl WebhookWorkerContext {
    /// Create a new worker context.
    #[must_use]
    pub const fn new(dispatcher: Arc<WebhookDispatcher>, retry: RetryConfig) -> Self {
        Self { dispatcher, retry }
    }
}

/// Worker function for delivering webhooks.
///
/// # Errors
/// Returns an error if the event is missing, storage or the queue fails, or
/// the event was left undelivered with no retry scheduled.
pub async fn deliver_webhook_worker(
    job: DeliverWebhookJob,
    ctx: Data<WebhookWorkerContext>,
) -> Result<(), Error> {
    process_delivery(&job, &ctx)
        .await
        .map_err(|e| Error::Failed(e.into()))
}

/// Run one delivery step for a job and classify the result.
pub async fn process_delivery(
    job: &DeliverWebhookJob,
    ctx: &WebhookWorkerContext,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!(event_id = %job.event_id, url = %job.webhook_url, "Delivering webhook");

    match deliver_or_reschedule(&ctx.dispatcher, job, &ctx.retry).await {
        Ok(DeliveryStep::AlreadyDelivered | DeliveryStep::Rescheduled { .. }) => Ok(()),
        Ok(DeliveryStep::Finished(report)) if report.delivered => Ok(()),
        Ok(DeliveryStep::Finished(report)) => {
            warn!(
                event_id = %job.event_id,
                attempts = report.attempts,
                status = %report.outcome.status_line(),
                "Webhook left undelivered"
            );
            Err(format!(
                "Webhook {} undelivered after {} attempts: {}",
                job.event_id,
                report.attempts,
                report.outcome.status_line()
            )
            .into())
        }
        Ok(DeliveryStep::Exhausted { attempts }) => Err(format!(
            "Webhook {} undelivered after {attempts} attempts",
            job.event_id
        )
        .into()),
        Err(AppError::EventNotFound(id)) => {
            // Nothing left to deliver; the job is dropped.
            error!(event_id = %id, "Webhook event not found");
            Err(format!("Webhook event not found: {id}").into())
        }
        Err(e) => {
            error!(event_id = %job.event_id, error = %e, "Failed to deliver webhook");
            Err(e.into())
        }
    }
}
