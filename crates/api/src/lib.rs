//! HTTP API layer for PingFox webhooks.
//!
//! This crate provides:
//!
//! - **Endpoints**: operator queries over recorded webhook events
//! - **Receiver**: a reference endpoint that verifies webhook signatures
//! - **State**: the shared handles handlers read from
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
