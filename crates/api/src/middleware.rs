//! API state.

use pingfox_core::EventStore;
use std::sync::Arc;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Store the operator endpoints read from.
    pub event_store: EventStore,
    /// Secret the reference receiver verifies signatures against.
    pub receiver_secret: Option<Arc<str>>,
}

impl AppState {
    /// Create application state.
    #[must_use]
    pub fn new(event_store: EventStore, receiver_secret: Option<String>) -> Self {
        Self {
            event_store,
            receiver_secret: receiver_secret
                .filter(|s| !s.is_empty())
                .map(Arc::from),
        }
    }
}
