use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<Mutex<()>>>;

/// Lazily created async mutex per key.
///
/// Operations on different keys proceed concurrently; operations on the same
/// key are serialized. Guards are owned so they can be held across `.await`
/// points and moved between tasks. An entry lives only while some guard holds
/// it or some task waits on it; the last guard out removes it.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Arc<StdMutex<LockMap>>,
}

/// One held key. Releases the lock and drops an idle entry on drop.
pub struct KeyGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: Arc<StdMutex<LockMap>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Release first so our own Arc no longer counts.
        self.guard.take();
        let mut locks = lock_map(&self.locks);
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Locks held by one operation. Released on drop.
pub struct HeldLocks {
    _guards: Vec<KeyGuard>,
}

fn lock_map(locks: &StdMutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for a key.
    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        lock_map(&self.locks)
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn acquire(&self, key: &str) -> KeyGuard {
        let guard = self.lock_for(key).lock_owned().await;
        KeyGuard {
            guard: Some(guard),
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Acquire several keys in sorted order, skipping duplicates.
    ///
    /// Every caller uses the same order, so two operations needing
    /// overlapping key sets cannot deadlock each other.
    pub async fn acquire_many<I, S>(&self, keys: I) -> HeldLocks
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.acquire(key).await);
        }
        HeldLocks { _guards: guards }
    }

    /// Number of keys with a lock entry.
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
