//! Outbound webhook wire format.

use chrono::{DateTime, SecondsFormat, Utc};
use pingfox_common::{AppError, AppResult};
use pingfox_db::entities::webhook_event::{self, EventType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of every webhook POST.
///
/// Field order is fixed by the struct and `data` keys serialize sorted, so the
/// same stored event always produces the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: String,
    pub team_id: String,
    pub site_id: Option<String>,
    pub data: Value,
}

impl From<&webhook_event::Model> for WebhookPayload {
    fn from(event: &webhook_event::Model) -> Self {
        Self {
            id: event.id.clone(),
            event_type: event.event_type,
            timestamp: format_timestamp(event.created_at),
            team_id: event.team_id.clone(),
            site_id: event.site_id.clone(),
            data: event.data.clone(),
        }
    }
}

/// ISO-8601 UTC timestamp with microseconds, e.g. `2025-01-01T12:00:00.000000Z`.
#[must_use]
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serialize an event into the exact bytes that are signed and sent.
pub fn serialize_event(event: &webhook_event::Model) -> AppResult<Vec<u8>> {
    Ok(serde_json::to_vec(&WebhookPayload::from(event))?)
}

/// Data carried by a `form.submitted` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmittedData {
    pub form_id: String,
    pub form_name: String,
    pub submission_id: String,
    pub submitted_at: String,
    pub fields: Map<String, Value>,
}

impl FormSubmittedData {
    /// Build the payload for a form submission.
    #[must_use]
    pub fn new(
        form_id: impl Into<String>,
        form_name: impl Into<String>,
        submission_id: impl Into<String>,
        submitted_at: DateTime<Utc>,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            form_id: form_id.into(),
            form_name: form_name.into(),
            submission_id: submission_id.into(),
            submitted_at: format_timestamp(submitted_at),
            fields,
        }
    }

    /// Convert into the opaque payload document accepted by `emit_event`.
    pub fn into_value(self) -> AppResult<Value> {
        serde_json::to_value(self)
            .map_err(|e| AppError::Internal(format!("Failed to serialize form data: {e}")))
    }
}

/// Tenant webhook registration, owned by the billing/settings side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantWebhook {
    pub webhook_url: Option<String>,
    pub secret: Option<String>,
}

impl TenantWebhook {
    /// Registration with both URL and secret set.
    #[must_use]
    pub fn new(webhook_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            webhook_url: Some(webhook_url.into()),
            secret: Some(secret.into()),
        }
    }

    /// URL and secret, or `None` if either is missing or empty.
    #[must_use]
    pub fn endpoint(&self) -> Option<(&str, &str)> {
        let url = self.webhook_url.as_deref().filter(|u| !u.trim().is_empty())?;
        let secret = self.secret.as_deref().filter(|s| !s.is_empty())?;
        Some((url, secret))
    }
}
