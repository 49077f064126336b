//! In-memory deduplication store: per source-key set of observed item identities.
//!
//! State lives for the process lifetime only. Sets grow monotonically; nothing is evicted.

use crate::domain::SourceKey;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct SeenStore {
    sets: Mutex<HashMap<SourceKey, HashSet<String>>>,
}

impl SeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True exactly once per source-key: the first time the key is looked at, by this
    /// call or by [`SeenStore::is_novel`]. Items observed during that cycle form the baseline.
    pub fn is_baseline_cycle(&self, key: &SourceKey) -> bool {
        let mut sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        if sets.contains_key(key) {
            return false;
        }
        sets.insert(key.clone(), HashSet::new());
        true
    }

    /// Record `identity` as seen under `key`; returns whether it was previously unseen.
    pub fn is_novel(&self, key: &SourceKey, identity: &str) -> bool {
        let mut sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        sets.entry(key.clone())
            .or_default()
            .insert(identity.to_string())
    }

    pub fn contains(&self, key: &SourceKey, identity: &str) -> bool {
        let sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        sets.get(key).is_some_and(|s| s.contains(identity))
    }

    /// Number of identities recorded for `key`.
    pub fn len(&self, key: &SourceKey) -> usize {
        let sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        sets.get(key).map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_is_reported_once_per_key() {
        let store = SeenStore::new();
        let a = SourceKey::repo("o", "a");
        let b = SourceKey::repo("o", "b");
        assert!(store.is_baseline_cycle(&a));
        assert!(!store.is_baseline_cycle(&a));
        assert!(store.is_baseline_cycle(&b));
    }

    #[test]
    fn novelty_is_recorded_as_side_effect() {
        let store = SeenStore::new();
        let key = SourceKey::repo("o", "a");
        assert!(store.is_novel(&key, "sha1"));
        assert!(!store.is_novel(&key, "sha1"));
        assert!(store.contains(&key, "sha1"));
        assert_eq!(store.len(&key), 1);
    }

    #[test]
    fn identities_are_scoped_per_key() {
        let store = SeenStore::new();
        assert!(store.is_novel(&SourceKey::chat(1), "msg-1"));
        assert!(store.is_novel(&SourceKey::chat(2), "msg-1"));
    }

    #[test]
    fn key_first_touched_by_novelty_check_has_no_baseline() {
        let store = SeenStore::new();
        let key = SourceKey::chat(1);
        store.is_novel(&key, "msg-1");
        assert!(!store.is_baseline_cycle(&key));
    }
}
