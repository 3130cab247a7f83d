use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Exclusive access to one content hash while its audio is written and
/// uploaded, shared by every run of an orchestrator
#[derive(Debug, Clone, Default)]
pub struct InFlightHashes {
    locks: Arc<Mutex<HashMap<String, Weak<AsyncMutex<()>>>>>,
}

/// Held for the duration of the write; releases on drop
#[derive(Debug)]
pub struct HashGuard {
    _guard: OwnedMutexGuard<()>,
    /// Another holder had the hash when this one asked for it
    pub waited: bool,
}

impl InFlightHashes {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, content_hash: &str) -> HashGuard {
        let lock = self.lock_for(content_hash);

        match lock.clone().try_lock_owned() {
            Ok(guard) => HashGuard {
                _guard: guard,
                waited: false,
            },
            Err(_) => {
                tracing::debug!(content_hash, "Waiting for in-flight work on the same hash");
                HashGuard {
                    _guard: lock.lock_owned().await,
                    waited: true,
                }
            }
        }
    }

    /// Hashes currently held or awaited
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_for(&self, content_hash: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        locks.retain(|_, lock| lock.strong_count() > 0);

        if let Some(lock) = locks.get(content_hash).and_then(Weak::upgrade) {
            return lock;
        }

        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(content_hash.to_string(), Arc::downgrade(&lock));
        lock
    }
}
