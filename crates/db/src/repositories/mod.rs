//! Database repositories.

mod webhook_event;

pub use webhook_event::WebhookEventRepository;
