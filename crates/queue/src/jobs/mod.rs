//! Job definitions.

mod deliver;

pub use deliver::DeliverWebhookJob;
