//! JSON document record store.
//!
//! The whole collection lives in one file. Every commit serializes the
//! updated collection and swaps it in with temp file + rename, so a crash
//! leaves either the previous or the next document on disk.
//!
//! The in-memory copy is refreshed whenever the file's size or modification
//! time changes, which lets a second process's writes surface as version
//! conflicts instead of being silently overwritten.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use roadwatch_store::{
    Collection, RecordKey, RecordKind, RecordStore, StoreError, StoredRecord, WriteBatch,
};

use crate::{document, fsutil};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

fn fingerprint(path: &Path) -> Result<Option<Fingerprint>, StoreError> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(Fingerprint {
            len: meta.len(),
            modified: meta.modified().ok(),
        })),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

struct State {
    collection: Collection,
    fingerprint: Option<Fingerprint>,
}

pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<State>,
}

impl JsonFileStore {
    /// Open the document at `path`, creating an empty collection if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let collection = Self::load(&path)?;
        let fingerprint = fingerprint(&path)?;
        tracing::debug!(path = %path.display(), records = collection.len(), "opened JSON record store");
        Ok(Self {
            path,
            state: Mutex::new(State {
                collection,
                fingerprint,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<Collection, StoreError> {
        match fsutil::read_optional(path)? {
            Some(bytes) => document::decode(&bytes),
            None => Ok(Collection::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("JSON store lock poisoned".into()))
    }

    /// Lock and reload the collection if the file changed underneath us.
    fn fresh(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut state = self.lock()?;
        let current = fingerprint(&self.path)?;
        if current != state.fingerprint {
            tracing::debug!(path = %self.path.display(), "document changed on disk, reloading");
            state.collection = Self::load(&self.path)?;
            state.fingerprint = current;
        }
        Ok(state)
    }

    fn persist(&self, state: &mut State, next: Collection) -> Result<(), StoreError> {
        let bytes = document::encode(&next)?;
        fsutil::write_atomic(&self.path, &bytes)?;
        state.collection = next;
        state.fingerprint = fingerprint(&self.path)?;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
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
        "json"
    }
}
