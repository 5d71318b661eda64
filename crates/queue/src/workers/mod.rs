//! Job workers.

mod deliver;

pub use deliver::{WebhookWorkerContext, deliver_webhook_worker, process_delivery};
