//! Per-key async mutual exclusion.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Entries are pruned once the table grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// A table of async mutexes keyed by `K`.
///
/// Holders of the same key run one at a time; different keys never contend.
/// Idle entries are dropped lazily so the table does not grow without bound.
#[derive(Debug)]
pub struct KeyedLocks<K: Eq + Hash + Clone> {
    /// One mutex per key currently in use.
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquire the lock for `key`, waiting for any current holder.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(
            self.locks
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        if self.locks.len() > PRUNE_THRESHOLD {
            self.prune();
        }

        mutex.lock_owned().await
    }

    /// Drop entries nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, m| Arc::strong_count(m) > 1);
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
