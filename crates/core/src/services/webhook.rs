//! Webhook dispatcher for tenant event notifications.
//!
//! Events are recorded synchronously by their producers and delivered
//! asynchronously by queue workers. Each call to [`WebhookDispatcher::deliver`]
//! is exactly one signed POST; retry policy lives with the caller.

use chrono::{SubsecRound, Utc};
use pingfox_common::config::WebhookConfig;
use pingfox_common::{AppError, AppResult, IdGenerator, SIGNATURE_HEADER, sign};
use pingfox_db::entities::webhook_event::{self, EventType};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::services::delivery::{DeliveryTask, WebhookQueueService};
use crate::services::payload::{TenantWebhook, serialize_event};
use crate::services::store::EventStore;

/// User agent sent with every delivery.
pub const USER_AGENT: &str = concat!("PingFox-Webhook/", env!("CARGO_PKG_VERSION"));

/// Characters of the response body kept in `last_delivery_status`.
pub const RESPONSE_SNIPPET_CHARS: usize = 200;

/// Bytes of a response body read before the rest is discarded.
const RESPONSE_READ_LIMIT: usize = 4 * RESPONSE_SNIPPET_CHARS;

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The receiver answered with a status below 400.
    Delivered { status: u16, body: String },
    /// The receiver answered with a status of 400 or above.
    NonSuccessResponse { status: u16, body: String },
    /// The request never produced a response (DNS, connect, TLS, timeout).
    TransportFailure { message: String },
}

impl DeliveryOutcome {
    fn from_response(status: u16, body: &str) -> Self {
        let body: String = body.chars().take(RESPONSE_SNIPPET_CHARS).collect();
        if status < 400 {
            Self::Delivered { status, body }
        } else {
            Self::NonSuccessResponse { status, body }
        }
    }

    /// Whether the receiver accepted the event.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// HTTP status code, if a response was received.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Delivered { status, .. } | Self::NonSuccessResponse { status, .. } => {
                Some(*status)
            }
            Self::TransportFailure { .. } => None,
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, 5xx, 408 and 429 are retryable; other 4xx mean the
    /// receiver rejected the request itself.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Delivered { .. } => false,
            Self::TransportFailure { .. } => true,
            Self::NonSuccessResponse { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
        }
    }

    /// Summary stored in `last_delivery_status`.
    #[must_use]
    pub fn status_line(&self) -> String {
        match self {
            Self::Delivered { status, body } | Self::NonSuccessResponse { status, body } => {
                format!("{status}: {body}")
            }
            Self::TransportFailure { message } => format!("Error: {message}"),
        }
    }
}

/// What a delivery attempt did to the event record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub event_id: String,
    pub outcome: DeliveryOutcome,
    /// `delivery_attempts` after this attempt was recorded.
    pub attempts: i32,
    /// `delivered` after this attempt was recorded.
    pub delivered: bool,
}

/// Records, signs and delivers webhook events.
#[derive(Clone)]
pub struct WebhookDispatcher {
    store: EventStore,
    queue: WebhookQueueService,
    http_client: reqwest::Client,
    id_gen: IdGenerator,
}

impl WebhookDispatcher {
    /// Create a new webhook dispatcher.
    pub fn new(
        store: EventStore,
        queue: WebhookQueueService,
        config: &WebhookConfig,
    ) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            store,
            queue,
            http_client,
            id_gen: IdGenerator::new(),
        })
    }

    /// The event store this dispatcher writes to.
    #[must_use]
    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// The queue deliveries are scheduled on.
    #[must_use]
    pub fn queue(&self) -> &WebhookQueueService {
        &self.queue
    }

    // ==================== Emission ====================

    /// Record a domain event and schedule its delivery.
    ///
    /// Returns `Ok(None)` without creating anything when the tenant has no
    /// complete webhook registration. Unknown event types are rejected
    /// before persistence; a scheduling failure is returned after the event
    /// was stored, so the caller can roll back its transaction.
    pub async fn emit_event(
        &self,
        event_type: &str,
        team_id: &str,
        site_id: Option<&str>,
        payload: Value,
        tenant: &TenantWebhook,
    ) -> AppResult<Option<webhook_event::Model>> {
        let Some(event) = self.prepare_event(event_type, team_id, site_id, payload, tenant)? else {
            return Ok(None);
        };

        let event = self.store.insert(event).await?;
        self.schedule_delivery(&event, tenant).await?;

        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            team_id = %event.team_id,
            "Webhook event emitted"
        );

        Ok(Some(event))
    }

    /// Build a new, unsaved event record for a tenant.
    ///
    /// Runs the same checks as [`Self::emit_event`] and returns `Ok(None)`
    /// when the tenant has no complete webhook registration. Callers that
    /// persist the event inside their own database transaction call
    /// [`Self::schedule_delivery`] after that transaction commits; a worker
    /// running before the commit would not find the event.
    pub fn prepare_event(
        &self,
        event_type: &str,
        team_id: &str,
        site_id: Option<&str>,
        payload: Value,
        tenant: &TenantWebhook,
    ) -> AppResult<Option<webhook_event::Model>> {
        let event_type: EventType = event_type
            .parse()
            .map_err(|_| AppError::InvalidEventType(event_type.to_string()))?;

        if team_id.is_empty() {
            return Err(AppError::Validation("team_id must not be empty".to_string()));
        }

        let Some((webhook_url, _)) = tenant.endpoint() else {
            debug!(
                team_id = %team_id,
                event_type = %event_type,
                "Tenant has no webhook registration, skipping event"
            );
            return Ok(None);
        };
        validate_webhook_url(webhook_url)?;

        Ok(Some(webhook_event::Model {
            id: self.id_gen.generate_event_id(),
            event_type,
            created_at: Utc::now().trunc_subsecs(6),
            team_id: team_id.to_string(),
            site_id: site_id.map(str::to_string),
            data: payload,
            delivered: false,
            delivery_attempts: 0,
            last_delivery_status: None,
        }))
    }

    /// Schedule delivery of a stored event to the tenant endpoint.
    ///
    /// The registration must be complete and valid; an event prepared by
    /// [`Self::prepare_event`] for the same tenant always is.
    pub async fn schedule_delivery(
        &self,
        event: &webhook_event::Model,
        tenant: &TenantWebhook,
    ) -> AppResult<()> {
        let Some((webhook_url, secret)) = tenant.endpoint() else {
            return Err(AppError::Validation(format!(
                "Team {} has no complete webhook registration",
                event.team_id
            )));
        };
        validate_webhook_url(webhook_url)?;

        self.queue
            .queue_delivery(DeliveryTask {
                event_id: event.id.clone(),
                webhook_url: webhook_url.to_string(),
                secret: secret.to_string(),
            })
            .await
            .inspect_err(|e| {
                error!(event_id = %event.id, error = %e, "Failed to schedule webhook delivery");
            })
    }

    // ==================== Delivery ====================

    /// Make one delivery attempt for a stored event.
    ///
    /// HTTP and transport failures are recorded on the event and reported in
    /// the returned [`DeliveryReport`]; they are never returned as errors.
    /// Errors are limited to a missing event and storage failures.
    pub async fn deliver(
        &self,
        event_id: &str,
        webhook_url: &str,
        secret: &str,
    ) -> AppResult<DeliveryReport> {
        let Some(mut event) = self.store.find_by_id(event_id).await? else {
            error!(event_id = %event_id, "Webhook event not found, dropping delivery");
            return Err(AppError::EventNotFound(event_id.to_string()));
        };

        let body = serialize_event(&event)?;
        let signature = sign(&body, secret);

        debug!(event_id = %event_id, url = %webhook_url, "Delivering webhook");
        let outcome = self.post(webhook_url, &signature, body).await;
        let status_line = outcome.status_line();
        let success = outcome.is_success();

        // A lost swap means another attempt was recorded; reload and reapply.
        loop {
            let expected = event.delivery_attempts;
            if self
                .store
                .record_attempt(event_id, expected, success, &status_line)
                .await?
            {
                let report = DeliveryReport {
                    event_id: event_id.to_string(),
                    attempts: expected + 1,
                    delivered: event.delivered || success,
                    outcome,
                };
                log_report(&report, webhook_url);
                return Ok(report);
            }

            debug!(
                event_id = %event_id,
                expected = expected,
                "Attempt count changed, retrying update"
            );
            event = self
                .store
                .find_by_id(event_id)
                .await?
                .ok_or_else(|| AppError::EventNotFound(event_id.to_string()))?;
        }
    }

    async fn post(&self, webhook_url: &str, signature: &str, body: Vec<u8>) -> DeliveryOutcome {
        let result = self
            .http_client
            .post(webhook_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let text = read_snippet(response).await;
                DeliveryOutcome::from_response(status, &text)
            }
            Err(e) => DeliveryOutcome::TransportFailure {
                message: e.to_string(),
            },
        }
    }
}

/// Read the start of a response body, at most `RESPONSE_READ_LIMIT` bytes.
async fn read_snippet(mut response: reqwest::Response) -> String {
    let mut buf = Vec::new();
    while buf.len() < RESPONSE_READ_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    buf.truncate(RESPONSE_READ_LIMIT);
    String::from_utf8_lossy(&buf).into_owned()
}

fn validate_webhook_url(webhook_url: &str) -> AppResult<()> {
    let url = Url::parse(webhook_url)
        .map_err(|e| AppError::Validation(format!("Invalid webhook URL: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::Validation(
            "Webhook URL must start with http:// or https://".to_string(),
        ));
    }
    Ok(())
}

fn log_report(report: &DeliveryReport, webhook_url: &str) {
    match &report.outcome {
        DeliveryOutcome::Delivered { status, .. } => info!(
            event_id = %report.event_id,
            url = %webhook_url,
            status = status,
            attempts = report.attempts,
            "Webhook delivered"
        ),
        DeliveryOutcome::NonSuccessResponse { status, .. } => warn!(
            event_id = %report.event_id,
            url = %webhook_url,
            status = status,
            attempts = report.attempts,
            "Webhook receiver rejected delivery"
        ),
        DeliveryOutcome::TransportFailure { message } => warn!(
            event_id = %report.event_id,
            url = %webhook_url,
            error = %message,
            attempts = report.attempts,
            "Webhook delivery failed"
        ),
    }
}
