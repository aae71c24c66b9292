use std::sync::Arc;

use dashmap::DashMap;

/// In-memory single-use bookkeeping for scanned tokens.
///
/// Keyed by tag: the tag is a deterministic function of the signed payload,
/// so two serializations of the same token land on the same key. Entries
/// older than the validity window are purged; an expired token is rejected
/// by verification before the registry is ever consulted.
#[derive(Clone, Default)]
pub struct ScanRegistry {
    seen: Arc<DashMap<String, i64>>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tag as consumed. Returns false when it was already consumed.
    pub fn consume(&self, tag: &str, issued_at_millis: i64) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.seen.entry(tag.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(issued_at_millis);
                true
            }
        }
    }

    /// Drop entries whose tokens can no longer verify anyway.
    pub fn purge_expired(&self, now_millis: i64, validity_window_ms: i64) {
        self.seen
            .retain(|_, issued_at| now_millis - *issued_at <= validity_window_ms);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_consume_succeeds_second_fails() {
        let registry = ScanRegistry::new();
        assert!(registry.consume("tag-a", 1_000));
        assert!(!registry.consume("tag-a", 1_000));
    }

    #[test]
    fn distinct_tags_are_independent() {
        let registry = ScanRegistry::new();
        assert!(registry.consume("tag-a", 1_000));
        assert!(registry.consume("tag-b", 1_000));
    }

    #[test]
    fn purge_drops_entries_past_the_window() {
        let registry = ScanRegistry::new();
        registry.consume("old", 0);
        registry.consume("fresh", 90_000);

        registry.purge_expired(100_000, 50_000);

        assert_eq!(registry.len(), 1);
        assert!(!registry.consume("fresh", 90_000));
        assert!(registry.consume("old", 0));
    }
}
