//! Database entities.

#![allow(missing_docs)]

pub mod webhook_event;

pub use webhook_event::Entity as WebhookEvent;
