//! Last-seen sequence table for dropping stale or duplicate deliveries.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::types::{Key, Sequence};

/// Tracks the last accepted sequence per `(route, key)`.
///
/// The guard does no locking of its own. Callers must hold the key's lock from
/// [`KeyedMutex`](crate::keyed_mutex::KeyedMutex) around every `accept` for that key
/// so the compare-and-update cannot interleave with another delivery of the same key.
///
/// Entries are created on the first accepted sequence and kept for the life of the
/// process.
#[derive(Debug, Clone)]
pub struct ReplayGuard<K = Key, S = Sequence> {
    last_seen: HashMap<Arc<str>, HashMap<K, S>>,
}

impl<K: Hash + Eq + Clone, S: Ord> ReplayGuard<K, S> {
    pub fn new() -> Self {
        Self {
            last_seen: HashMap::new(),
        }
    }

    /// Returns `true` when the delivery should reach the handler.
    ///
    /// Without a sequence every delivery is accepted and nothing is recorded.
    /// Otherwise the sequence must be strictly greater than the last accepted one;
    /// an equal sequence is a duplicate.
    pub fn accept(&mut self, route: &str, key: &K, seq: Option<S>) -> bool {
        let Some(seq) = seq else {
            return true;
        };

        match self.last_seen.get_mut(route) {
            Some(keys) => match keys.get_mut(key) {
                Some(last) if seq <= *last => return false,
                Some(last) => *last = seq,
                None => {
                    keys.insert(key.clone(), seq);
                }
            },
            None => {
                let mut keys = HashMap::new();
                keys.insert(key.clone(), seq);
                self.last_seen.insert(Arc::from(route), keys);
            }
        }
        true
    }

    /// The last accepted sequence for `(route, key)`.
    pub fn last_seen(&self, route: &str, key: &K) -> Option<&S> {
        self.last_seen.get(route)?.get(key)
    }

    /// Number of `(route, key)` pairs with a recorded sequence.
    pub fn len(&self) -> usize {
        self.last_seen.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Hash + Eq + Clone, S: Ord> Default for ReplayGuard<K, S> {
    fn default() -> Self {
        Self::new()
    }
}
