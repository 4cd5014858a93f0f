//! Identifier generation for messages and anything else that needs one.
//!
//! Two generators with different guarantees:
//! - [`message_id`] is a random UUID, unique across the process lifetime
//!   (and in practice across processes). Every envelope id and therefore
//!   every `requestId` comes from here.
//! - [`next_serial`] is a cheap monotonic counter for local bookkeeping
//!   that only needs process-wide uniqueness, not unguessability.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// A fresh message identifier.
pub fn message_id() -> String {
    Uuid::new_v4().to_string()
}

/// The next value of the process-wide monotonic counter. Starts at 1.
pub fn next_serial() -> u64 {
    NEXT_SERIAL.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_message_ids_pairwise_distinct_over_ten_thousand() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(message_id()), "duplicate message id");
        }
    }

    #[test]
    fn test_message_id_is_not_empty() {
        assert!(!message_id().is_empty());
    }

    #[test]
    fn test_serials_strictly_increase() {
        let a = next_serial();
        let b = next_serial();
        assert!(b > a);
    }
}
