//! Core business logic for PingFox webhook delivery.

pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use services::*;
