//! Background webhook delivery for PingFox.
//!
//! This crate runs webhook deliveries off the request path using Redis:
//!
//! - **Jobs**: webhook delivery tasks
//! - **Workers**: delivery execution with Apalis
//! - **Retry**: re-enqueue with exponential backoff, bounded by an attempt budget

pub mod delivery_impl;
pub mod jobs;
pub mod retry;
pub mod workers;

pub use delivery_impl::RedisWebhookQueue;
pub use jobs::*;
pub use retry::{DeliveryStep, RetryConfig, deliver_or_reschedule};
pub use workers::*;
