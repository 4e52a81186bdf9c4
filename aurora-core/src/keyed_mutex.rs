//! Per-key exclusive locks, created on demand and evicted when unused.
//!
//! Every key maps to a lock entry holding an async mutex and a reference count of
//! the tasks currently holding or waiting on it. The table itself sits behind one
//! synchronous guard that is only taken to create, count or remove entries, never
//! while awaiting a key's mutex or running protected code, so unrelated keys never
//! serialize on each other.
//!
//! Limitations:
//! - Waiters on the same key are woken in the order the underlying mutex chooses.
//!   Arrival order of deliveries is not preserved; a per-key single-worker queue is
//!   the alternative when strict ordering matters.
//! - Acquiring a key the current task already holds deadlocks.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct LockEntry {
    mutex: Arc<AsyncMutex<()>>,
    refcount: usize,
}

type LockTable<K> = HashMap<K, LockEntry>;

/// A dynamic set of per-key locks.
///
/// Cloning yields another handle onto the same table.
pub struct KeyedMutex<K> {
    table: Arc<Mutex<LockTable<K>>>,
}

impl<K: Hash + Eq + Clone> KeyedMutex<K> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Waits until `key` is free and returns a guard holding it.
    ///
    /// Dropping the returned future while it waits gives back its reference on the
    /// entry, so abandoned waits never leak table entries.
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        let interest = self.register(key);
        let permit = Arc::clone(&interest.mutex).lock_owned().await;
        KeyedGuard {
            _permit: permit,
            interest,
        }
    }

    /// Takes `key` only if nobody holds it right now.
    pub fn try_lock(&self, key: K) -> Option<KeyedGuard<K>> {
        let interest = self.register(key);
        let permit = Arc::clone(&interest.mutex).try_lock_owned().ok()?;
        Some(KeyedGuard {
            _permit: permit,
            interest,
        })
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.table().contains_key(key)
    }

    /// Holders plus waiters for `key`; zero when the key has no entry.
    pub fn refcount(&self, key: &K) -> usize {
        self.table().get(key).map_or(0, |entry| entry.refcount)
    }

    fn register(&self, key: K) -> Interest<K> {
        let mut table = self.table();
        let entry = table.entry(key.clone()).or_insert_with(|| LockEntry {
            mutex: Arc::new(AsyncMutex::new(())),
            refcount: 0,
        });
        entry.refcount += 1;
        let mutex = Arc::clone(&entry.mutex);
        drop(table);

        Interest {
            table: Arc::clone(&self.table),
            key,
            mutex,
        }
    }

    fn table(&self) -> MutexGuard<'_, LockTable<K>> {
        lock_table(&self.table)
    }
}

impl<K: Hash + Eq + Clone> Default for KeyedMutex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for KeyedMutex<K> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<K> fmt::Debug for KeyedMutex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedMutex")
            .field("entries", &lock_table(&self.table).len())
            .finish()
    }
}

// No table mutation can be interrupted halfway, so a poisoned guard is still consistent.
fn lock_table<K>(table: &Mutex<LockTable<K>>) -> MutexGuard<'_, LockTable<K>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One counted reference on a lock entry. Dropping it returns the reference and
/// evicts the entry when it was the last one.
struct Interest<K: Hash + Eq> {
    table: Arc<Mutex<LockTable<K>>>,
    key: K,
    mutex: Arc<AsyncMutex<()>>,
}

impl<K: Hash + Eq> Drop for Interest<K> {
    fn drop(&mut self) {
        let mut table = lock_table(&self.table);
        if let Some(entry) = table.get_mut(&self.key) {
            entry.refcount -= 1;
            if entry.refcount == 0 {
                table.remove(&self.key);
                tracing::debug!(remaining = table.len(), "keyed lock entry evicted");
            }
        }
    }
}

/// Exclusive hold on one key, released on drop.
pub struct KeyedGuard<K: Hash + Eq> {
    // Field order is drop order: the key's mutex is released before the
    // reference is returned to the table.
    _permit: OwnedMutexGuard<()>,
    interest: Interest<K>,
}

impl<K: Hash + Eq> KeyedGuard<K> {
    pub fn key(&self) -> &K {
        &self.interest.key
    }
}

impl<K: Hash + Eq + fmt::Debug> fmt::Debug for KeyedGuard<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedGuard")
            .field("key", &self.interest.key)
            .finish_non_exhaustive()
    }
}
