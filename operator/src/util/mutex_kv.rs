use lazy_static::lazy_static;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

lazy_static! {
    /// Process-wide named locks. Handlers use this unless they are
    /// given their own instance.
    pub static ref GLOBAL_MUTEX_KV: Arc<MutexKv> = Arc::new(MutexKv::default());
}

/// A set of named async mutexes. Locking the same key serializes the
/// holders; different keys never block each other.
#[derive(Default)]
pub struct MutexKv {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MutexKv {
    /// Waits for and returns the lock named `key`. The lock is held
    /// until the guard is dropped.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        trace!(key, "locking");
        let guard = self.get(key).lock_owned().await;
        trace!(key, "locked");
        guard
    }

    /// Locks nobody holds or waits on are dropped here, so the map only
    /// grows with the number of keys in use at once.
    fn get(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|name, lock| name == key || Arc::strong_count(lock) > 1);
        locks.entry(key.to_owned()).or_default().clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
