//! Message id generation.
//!
//! Generated Call ids must be unique process-wide for at least the lifetime
//! of the slowest pending round trip, and short enough to fit comfortably
//! under the wire limit charging stations impose on message ids. A UUIDv4 in
//! hyphenated form is 36 characters and collision-free for our purposes.

use uuid::Uuid;

/// Generate a fresh OCPP message id.
pub fn generate_message_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_bounded() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let id = generate_message_id();
            assert!(id.len() <= 36);
            assert!(seen.insert(id));
        }
    }
}
