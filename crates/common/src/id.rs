//! ID generation utilities.

use rand::Rng;

/// Prefix carried by every webhook event ID.
pub const EVENT_ID_PREFIX: &str = "evt_";

/// Random bytes behind each event ID (128 bits).
const EVENT_ID_BYTES: usize = 16;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new webhook event ID.
    ///
    /// IDs are drawn from the thread-local CSPRNG, so collisions are negligible
    /// without a uniqueness round trip to the database. Format: `evt_` followed
    /// by 32 lowercase hex characters.
    #[must_use]
    pub fn generate_event_id(&self) -> String {
        let mut bytes = [0u8; EVENT_ID_BYTES];
        rand::thread_rng().fill(&mut bytes);
        format!("{EVENT_ID_PREFIX}{}", hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_event_id_format() {
        let id_gen = IdGenerator::new();
        let id = id_gen.generate_event_id();

        assert!(id.starts_with(EVENT_ID_PREFIX));
        assert_eq!(id.len(), EVENT_ID_PREFIX.len() + 32);
        assert!(
            id[EVENT_ID_PREFIX.len()..]
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_generate_event_id_unique() {
        let id_gen = IdGenerator::new();
        let ids: HashSet<String> = (0..10_000).map(|_| id_gen.generate_event_id()).collect();

        assert_eq!(ids.len(), 10_000);
    }
}
