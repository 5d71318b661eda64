//! Retry configuration and the per-run delivery step.

use pingfox_common::{AppError, AppResult};
use pingfox_common::config::WebhookConfig;
use pingfox_core::{DeliveryReport, WebhookDispatcher};
use std::time::Duration;
use tracing::{debug, warn};

use crate::jobs::DeliverWebhookJob;

/// Retry configuration with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total delivery attempts allowed per event, counting the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(60),    // 1 minute
            max_delay: Duration::from_secs(3600 * 24), // 24 hours
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Build the retry policy from the `webhook` configuration section.
    #[must_use]
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
            multiplier: config.backoff_multiplier,
        }
    }

    /// Calculate delay for the given retry number (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs.max(0.0))
    }

    /// Check if another attempt is allowed after `attempts` were made.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

/// What one run of a delivery job did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStep {
    /// The event was delivered earlier; nothing was sent.
    AlreadyDelivered,
    /// The event had used its attempt budget; nothing was sent.
    Exhausted {
        /// Attempts already recorded on the event.
        attempts: i32,
    },
    /// One attempt was made and no further attempt will follow.
    Finished(DeliveryReport),
    /// One attempt failed and the job was queued again to run after `delay`.
    Rescheduled {
        /// The failed attempt.
        report: DeliveryReport,
        /// Backoff before the retry runs.
        delay: Duration,
    },
}

/// Run one delivery attempt for a job and re-enqueue it on retryable failure.
///
/// Nothing is sent when the event is already delivered or its attempt count
/// has reached `max_attempts`. The worker never waits out the backoff: a
/// retry is handed back to the queue with the delay for the attempt just
/// made.
pub async fn deliver_or_reschedule(
    dispatcher: &WebhookDispatcher,
    job: &DeliverWebhookJob,
    config: &RetryConfig,
) -> AppResult<DeliveryStep> {
    let event = dispatcher
        .store()
        .find_by_id(&job.event_id)
        .await?
        .ok_or_else(|| AppError::EventNotFound(job.event_id.clone()))?;

    if event.delivered {
        debug!(event_id = %job.event_id, "Webhook already delivered, skipping");
        return Ok(DeliveryStep::AlreadyDelivered);
    }
    if !config.should_retry(attempt_count(event.delivery_attempts)) {
        warn!(
            event_id = %job.event_id,
            attempts = event.delivery_attempts,
            "Webhook delivery attempts exhausted, skipping"
        );
        return Ok(DeliveryStep::Exhausted {
            attempts: event.delivery_attempts,
        });
    }

    let report = dispatcher
        .deliver(&job.event_id, &job.webhook_url, &job.secret)
        .await?;

    if report.delivered {
        return Ok(DeliveryStep::Finished(report));
    }

    if !report.outcome.is_retryable() {
        warn!(
            event_id = %job.event_id,
            status = ?report.outcome.status_code(),
            "Webhook rejected by receiver, not retrying"
        );
        return Ok(DeliveryStep::Finished(report));
    }

    let attempts = attempt_count(report.attempts);
    if !config.should_retry(attempts) {
        warn!(
            event_id = %job.event_id,
            attempts = attempts,
            "Webhook delivery attempts exhausted"
        );
        return Ok(DeliveryStep::Finished(report));
    }

    let delay = config.delay_for_attempt(attempts.saturating_sub(1));
    dispatcher
        .queue()
        .queue_retry(job.clone().into(), delay)
        .await?;
    debug!(
        event_id = %job.event_id,
        attempts = attempts,
        delay_ms = delay.as_millis(),
        "Webhook delivery rescheduled"
    );

    Ok(DeliveryStep::Rescheduled { report, delay })
}

fn attempt_count(attempts: i32) -> u32 {
    u32::try_from(attempts).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let config = RetryConfig::default();

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(60));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(120));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(240));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(480));
    }

    #[test]
    fn test_max_delay() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_delay: Duration::from_secs(3600),
            max_delay: Duration::from_secs(7200),
            multiplier: 2.0,
        };

        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(7200));
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_secs(7200));
    }

    #[test]
    fn test_should_retry() {
        let config = RetryConfig {
            max_attempts: 3,
            ..Default::default()
        };

        assert!(config.should_retry(0));
        assert!(config.should_retry(1));
        assert!(config.should_retry(2));
        assert!(!config.should_retry(3));
        assert!(!config.should_retry(4));
    }

    #[test]
    fn test_from_config() {
        let webhook = WebhookConfig {
            max_attempts: 7,
            initial_delay_secs: 10,
            max_delay_secs: 100,
            backoff_multiplier: 3.0,
            ..Default::default()
        };
        let config = RetryConfig::from_config(&webhook);

        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(10));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(100));
    }

    #[test]
    fn test_defaults_match_webhook_config() {
        assert_eq!(
            RetryConfig::from_config(&WebhookConfig::default()),
            RetryConfig::default()
        );
    }
}
