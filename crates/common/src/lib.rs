//! Common utilities and shared types for PingFox.
//!
//! This crate provides foundational components used across all PingFox crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: Random, collision-resistant event identifiers via [`IdGenerator`]
//! - **Signatures**: HMAC-SHA256 signing and constant-time verification of webhook bodies
//!
//! # Example
//!
//! ```no_run
//! use pingfox_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate_event_id();
//!     println!("Generated ID: {} (timeout {}s)", id, config.webhook.timeout_secs);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod signature;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use signature::{SIGNATURE_HEADER, SIGNATURE_PREFIX, sign, signature_hex, verify};
