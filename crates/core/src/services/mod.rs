//! Webhook services.

#![allow(missing_docs)]

pub mod delivery;
pub mod payload;
pub mod store;
pub mod webhook;

pub use delivery::{DeliveryTask, NoOpWebhookQueue, WebhookQueue, WebhookQueueService};
pub use payload::{FormSubmittedData, TenantWebhook, WebhookPayload, serialize_event};
pub use store::{EventStore, WebhookEventStore};
pub use webhook::{DeliveryOutcome, DeliveryReport, WebhookDispatcher};
