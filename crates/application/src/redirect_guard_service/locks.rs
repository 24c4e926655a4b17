use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::Mutex as AsyncMutex;

/// Per-key async mutexes.
///
/// Entries are held weakly and pruned once every holder has dropped its
/// handle, so idle sessions do not accumulate.
#[derive(Default)]
pub(super) struct KeyedLocks {
    entries: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub(super) fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        entries.retain(|_, entry| entry.strong_count() > 0);

        let lock = Arc::new(AsyncMutex::new(()));
        entries.insert(key.to_owned(), Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    pub(super) fn tracked_keys(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
