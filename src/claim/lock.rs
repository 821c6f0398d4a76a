//! Advisory locks keyed by transaction ID.
//!
//! SQLite has no advisory locks, so the service keeps its own registry of
//! mutexes, one per transaction ID that is currently being settled. Two
//! callers settling the same transaction queue on the same mutex. Callers
//! settling different transactions never touch each other's mutex.
//!
//! # Thread Safety
//!
//! The registry is a [`DashMap`], so looking up a slot only locks one shard
//! and only for as long as it takes to clone the slot. Nobody blocks on a
//! slot's mutex while holding a shard.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RawMutex, lock_api::ArcMutexGuard};

use crate::database_id::TransactionId;

type Slot = Arc<Mutex<()>>;

/// A registry of locks, one per transaction ID.
///
/// Cloning the registry gives another handle to the same locks.
#[derive(Debug, Clone, Default)]
pub struct AdvisoryLocks {
    slots: Arc<DashMap<TransactionId, Slot>>,
}

impl AdvisoryLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock for `key` is free, then take it.
    ///
    /// The lock is held until the returned guard is dropped.
    pub fn lock(&self, key: TransactionId) -> AdvisoryLockGuard {
        // The shard lock is released at the end of this statement, before we block below.
        let slot: Slot = Arc::clone(&self.slots.entry(key).or_default());

        let guard = match slot.try_lock_arc() {
            Some(guard) => guard,
            None => {
                tracing::debug!("Waiting for the settlement lock on transaction {key}");
                slot.lock_arc()
            }
        };

        tracing::debug!("Acquired the settlement lock on transaction {key}");

        AdvisoryLockGuard {
            key,
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// The number of keys that are locked or have callers waiting on them.
    pub fn active_keys(&self) -> usize {
        self.slots.len()
    }
}

/// Holds the lock for one key. The lock is released when the guard is dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct AdvisoryLockGuard {
    key: TransactionId,
    slots: Arc<DashMap<TransactionId, Slot>>,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl AdvisoryLockGuard {
    /// The key this guard holds the lock for.
    pub fn key(&self) -> TransactionId {
        self.key
    }
}

impl std::fmt::Debug for AdvisoryLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisoryLockGuard")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl Drop for AdvisoryLockGuard {
    fn drop(&mut self) {
        // Unlock and give up this guard's reference to the slot first.
        drop(self.guard.take());

        // One reference means only the map knows about the slot, so nobody
        // holds it or is waiting on it. Waiters clone the slot under the
        // shard lock, which `remove_if` also holds.
        self.slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);

        tracing::debug!("Released the settlement lock on transaction {}", self.key);
    }
}
