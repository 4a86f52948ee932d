//! Nullable store: thread-safe in-memory record storage for testing.

use roadwatch_store::{
    Collection, RecordKey, RecordKind, RecordStore, StoreError, StoredRecord, WriteBatch,
};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// An in-memory record store for testing.
///
/// Thread-safe for use with tokio's multi-threaded runtime. Supports fault
/// injection:
/// - `fail_next_commits(n)`: the next `n` commits fail with a backend error
///   and write nothing.
/// - `inject_conflicts(n)`: the next `n` commits fail with a version conflict,
///   as if another process had written first.
/// - `set_unavailable(true)`: every call fails.
/// - `set_latency(d)`: every call sleeps first, widening race windows.
/// - `set_commit_latency(d)`: commits alone sleep first, then apply.
#[derive(Default)]
pub struct NullStore {
    collection: Mutex<Collection>,
    failing_commits: AtomicU32,
    injected_conflicts: AtomicU32,
    unavailable: AtomicBool,
    latency_micros: AtomicU64,
    commit_latency_micros: AtomicU64,
    commits: AtomicU64,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_commits(&self, n: u32) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    pub fn inject_conflicts(&self, n: u32) {
        self.injected_conflicts.store(n, Ordering::SeqCst);
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_micros
            .store(latency.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn set_commit_latency(&self, latency: Duration) {
        self.commit_latency_micros
            .store(latency.as_micros() as u64, Ordering::SeqCst);
    }

    /// Number of successfully applied commits.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Copy of everything stored.
    pub fn snapshot(&self) -> Collection {
        self.collection.lock().unwrap().clone()
    }

    fn enter(&self) -> Result<(), StoreError> {
        let micros = self.latency_micros.load(Ordering::SeqCst);
        if micros > 0 {
            std::thread::sleep(Duration::from_micros(micros));
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store switched off".into()));
        }
        Ok(())
    }

    /// Decrement `counter` if positive; true when a fault should fire.
    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl RecordStore for NullStore {
    fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError> {
        self.enter()?;
        Ok(self.collection.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &RecordKey, bytes: Vec<u8>) -> Result<u64, StoreError> {
        self.enter()?;
        Ok(self.collection.lock().unwrap().put(key.clone(), bytes))
    }

    fn scan(&self, kind: RecordKind) -> Result<Vec<(RecordKey, StoredRecord)>, StoreError> {
        self.enter()?;
        Ok(self.collection.lock().unwrap().scan(kind))
    }

    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        self.enter()?;
        let micros = self.commit_latency_micros.load(Ordering::SeqCst);
        if micros > 0 {
            std::thread::sleep(Duration::from_micros(micros));
        }
        if Self::take(&self.failing_commits) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        if Self::take(&self.injected_conflicts) {
            let key = batch
                .entries()
                .first()
                .map(|e| e.key.to_string())
                .unwrap_or_default();
            return Err(StoreError::VersionConflict {
                key,
                expected: 0,
                found: 0,
            });
        }
        self.collection.lock().unwrap().apply(batch)?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadwatch_types::ReportId;

    fn key() -> RecordKey {
        RecordKey::report(&ReportId::new("r1").unwrap())
    }

    fn batch() -> WriteBatch {
        let mut b = WriteBatch::new();
        b.push(key(), 0, b"{}".to_vec());
        b
    }

    #[test]
    fn injected_failure_writes_nothing() {
        let store = NullStore::new();
        store.fail_next_commits(1);
        assert!(store.commit(&batch()).is_err());
        assert!(store.get(&key()).unwrap().is_none());
        store.commit(&batch()).unwrap();
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn injected_conflicts_are_counted_down() {
        let store = NullStore::new();
        store.inject_conflicts(2);
        assert!(store.commit(&batch()).unwrap_err().is_conflict());
        assert!(store.commit(&batch()).unwrap_err().is_conflict());
        store.commit(&batch()).unwrap();
    }

    #[test]
    fn unavailable_fails_reads() {
        let store = NullStore::new();
        store.set_unavailable(true);
        assert!(store.get(&key()).is_err());
    }
}
