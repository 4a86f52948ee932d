//! Content-addressed snapshot record store.
//!
//! Each commit serializes the whole collection, stores it as a blob, and
//! rewrites the `HEAD` file to name the new blob. The previous snapshots
//! stay in the blob store, giving an append-only history for free.
//!
//! `HEAD` is re-read before every operation; if another writer moved it,
//! the collection is reloaded and stale batches fail with a version conflict.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use roadwatch_store::{
    BlobStore, Collection, RecordKey, RecordKind, RecordStore, StoreError, StoredRecord,
    WriteBatch,
};
use roadwatch_types::MediaHandle;

use crate::{document, fsutil};

struct State {
    collection: Collection,
    head: Option<String>,
}

pub struct ContentAddressedStore<B> {
    blobs: B,
    head_path: PathBuf,
    state: Mutex<State>,
}

impl<B: BlobStore> ContentAddressedStore<B> {
    /// Open the store whose pointer file is `head_path`, loading the
    /// snapshot it names. A missing `HEAD` means an empty collection.
    pub fn open(blobs: B, head_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let head_path = head_path.into();
        let head = Self::read_head(&head_path)?;
        let collection = match &head {
            Some(h) => Self::load_snapshot(&blobs, h)?,
            None => Collection::new(),
        };
        tracing::debug!(
            head = head.as_deref().unwrap_or("<none>"),
            records = collection.len(),
            "opened content-addressed record store"
        );
        Ok(Self {
            blobs,
            head_path,
            state: Mutex::new(State { collection, head }),
        })
    }

    /// Handle of the current snapshot, if any commit has happened.
    pub fn head(&self) -> Result<Option<String>, StoreError> {
        Ok(self.fresh()?.head.clone())
    }

    pub fn head_path(&self) -> &Path {
        &self.head_path
    }

    /// Load the collection as of an earlier snapshot handle.
    pub fn snapshot_at(&self, handle: &str) -> Result<Collection, StoreError> {
        Self::load_snapshot(&self.blobs, handle)
    }

    fn read_head(path: &Path) -> Result<Option<String>, StoreError> {
        Ok(fsutil::read_optional(path)?
            .map(|b| String::from_utf8_lossy(&b).trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    fn load_snapshot(blobs: &B, handle: &str) -> Result<Collection, StoreError> {
        let handle = MediaHandle::new(handle)
            .map_err(|e| StoreError::Corruption(format!("bad HEAD: {e}")))?;
        let bytes = blobs
            .get(&handle)
            .map_err(|e| StoreError::Backend(format!("snapshot {handle}: {e}")))?;
        document::decode(&bytes)
    }

    fn fresh(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Backend("snapshot store lock poisoned".into()))?;
        let head = Self::read_head(&self.head_path)?;
        if head != state.head {
            tracing::debug!(head = head.as_deref().unwrap_or("<none>"), "HEAD moved, reloading");
            state.collection = match &head {
                Some(h) => Self::load_snapshot(&self.blobs, h)?,
                None => Collection::new(),
            };
            state.head = head;
        }
        Ok(state)
    }

    fn persist(&self, state: &mut State, next: Collection) -> Result<(), StoreError> {
        let bytes = document::encode(&next)?;
        let handle = self
            .blobs
            .put(&bytes)
            .map_err(|e| StoreError::Backend(format!("snapshot upload: {e}")))?;
        fsutil::write_atomic(&self.head_path, handle.as_str().as_bytes())?;
        state.collection = next;
        state.head = Some(handle.as_str().to_string());
        Ok(())
    }
}

impl<B: BlobStore> RecordStore for ContentAddressedStore<B> {
    fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self.fresh()?.collection.get(key).cloned())
    }

    fn put(&self, key: &RecordKey, bytes: Vec<u8>) -> Result<u64, StoreError> {
        let mut state = self.fresh()?;
        let mut next = state.collection.clone();
        let version = next.put(key.clone(), bytes);
        self.persist(&mut state, next)?;
        Ok(version)
    }

    fn scan(&self, kind: RecordKind) -> Result<Vec<(RecordKey, StoredRecord)>, StoreError> {
        Ok(self.fresh()?.collection.scan(kind))
    }

    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut state = self.fresh()?;
        let mut next = state.collection.clone();
        next.apply(batch)?;
        self.persist(&mut state, next)
    }

    fn backend_name(&self) -> &'static str {
        "content_addressed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalBlobStore;
    use roadwatch_store::RecordStoreExt;
    use roadwatch_types::{Account, PrincipalId, Timestamp};

    fn account(id: &str, tokens: u64) -> Account {
        Account::new(PrincipalId::new(id).unwrap(), tokens, 70, Timestamp::EPOCH)
    }

    fn open(dir: &Path) -> ContentAddressedStore<LocalBlobStore> {
        let blobs = LocalBlobStore::open(dir.join("blobs")).unwrap();
        ContentAddressedStore::open(blobs, dir.join("HEAD")).unwrap()
    }

    #[test]
    fn head_moves_on_every_commit() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        assert!(store.head().unwrap().is_none());

        let mut batch = WriteBatch::new();
        batch.stage_account(&account("alice", 50), 0).unwrap();
        store.commit(&batch).unwrap();
        let first = store.head().unwrap().unwrap();

        let mut batch = WriteBatch::new();
        batch.stage_account(&account("alice", 60), 1).unwrap();
        store.commit(&batch).unwrap();
        let second = store.head().unwrap().unwrap();
        assert_ne!(first, second);

        // Older snapshot still readable.
        let old = store.snapshot_at(&first).unwrap();
        assert_eq!(old.len(), 1);
        assert_eq!(
            old.version_of(&RecordKey::account(&PrincipalId::new("alice").unwrap())),
            1
        );
    }

    #[test]
    fn reopen_follows_head() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open(dir.path());
            let mut batch = WriteBatch::new();
            batch.stage_account(&account("bob", 5), 0).unwrap();
            store.commit(&batch).unwrap();
        }
        let store = open(dir.path());
        let bob = store
            .load_account(&PrincipalId::new("bob").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(bob.record.token_balance, 5);
    }

    #[test]
    fn concurrent_writer_detected_through_head() {
        let dir = tempfile::tempdir().unwrap();
        let a = open(dir.path());
        let b = open(dir.path());

        let mut batch = WriteBatch::new();
        batch.stage_account(&account("carol", 1), 0).unwrap();
        a.commit(&batch).unwrap();

        let mut racing = WriteBatch::new();
        racing.stage_account(&account("carol", 2), 0).unwrap();
        assert!(b.commit(&racing).unwrap_err().is_conflict());
    }
}
