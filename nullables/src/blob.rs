//! Nullable blob store.

use roadwatch_store::{BlobError, BlobStore};
use roadwatch_types::MediaHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// In-memory blob store with a failure switch.
#[derive(Default)]
pub struct NullBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    next: AtomicU64,
    unavailable: AtomicBool,
}

impl NullBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for NullBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<MediaHandle, BlobError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("null blob store switched off".into()));
        }
        let name = format!("null_{}", self.next.fetch_add(1, Ordering::SeqCst));
        self.blobs.lock().unwrap().insert(name.clone(), bytes.to_vec());
        MediaHandle::new(name).map_err(|e| BlobError::Unavailable(e.to_string()))
    }

    fn get(&self, handle: &MediaHandle) -> Result<Vec<u8>, BlobError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("null blob store switched off".into()));
        }
        self.blobs
            .lock()
            .unwrap()
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| BlobError::NotFound(handle.to_string()))
    }
}
