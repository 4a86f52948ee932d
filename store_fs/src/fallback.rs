//! Blob store with a local degraded-mode cache.
//!
//! Uploads go to the primary store. If the primary fails, the bytes are
//! written to a local cache directory under a `local_<millis>_<rand>` handle
//! and the upload still succeeds. Reads consult the cache first, so a cached
//! handle keeps resolving after the primary recovers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use roadwatch_store::{BlobError, BlobStore};
use roadwatch_types::{MediaHandle, Timestamp};

use crate::fsutil;

const LOCAL_PREFIX: &str = "local_";

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

fn random_suffix() -> String {
    let mut buf = [0u8; 6];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => hex::encode(buf),
        Err(_) => format!("{:012x}", FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed)),
    }
}

/// Handles minted by the local cache.
pub fn is_local_handle(handle: &MediaHandle) -> bool {
    handle.as_str().starts_with(LOCAL_PREFIX)
}

/// A handle that can be used as a single path component.
fn is_safe_name(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

pub struct FallbackBlobStore<P> {
    primary: P,
    cache_dir: PathBuf,
}

impl<P: BlobStore> FallbackBlobStore<P> {
    pub fn new(primary: P, cache_dir: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { primary, cache_dir })
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    fn store_locally(&self, bytes: &[u8]) -> Result<MediaHandle, BlobError> {
        let name = format!(
            "{LOCAL_PREFIX}{}_{}",
            Timestamp::now().as_millis(),
            random_suffix()
        );
        fsutil::write_atomic(&self.cache_dir.join(&name), bytes)?;
        MediaHandle::new(name).map_err(|e| BlobError::Unavailable(e.to_string()))
    }
}

impl<P: BlobStore> BlobStore for FallbackBlobStore<P> {
    fn put(&self, bytes: &[u8]) -> Result<MediaHandle, BlobError> {
        match self.primary.put(bytes) {
            Ok(handle) => Ok(handle),
            Err(e) => {
                tracing::warn!(error = %e, "primary blob store failed, caching locally");
                let handle = self.store_locally(bytes)?;
                tracing::info!(handle = %handle, "blob stored in local cache");
                Ok(handle)
            }
        }
    }

    fn get(&self, handle: &MediaHandle) -> Result<Vec<u8>, BlobError> {
        if is_safe_name(handle.as_str()) {
            if let Some(bytes) = fsutil::read_optional(&self.cache_dir.join(handle.as_str()))? {
                return Ok(bytes);
            }
        }
        if is_local_handle(handle) {
            return Err(BlobError::NotFound(handle.to_string()));
        }
        self.primary.get(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalBlobStore;

    struct DownStore;

    impl BlobStore for DownStore {
        fn put(&self, _bytes: &[u8]) -> Result<MediaHandle, BlobError> {
            Err(BlobError::Unavailable("connection refused".into()))
        }
        fn get(&self, handle: &MediaHandle) -> Result<Vec<u8>, BlobError> {
            Err(BlobError::NotFound(handle.to_string()))
        }
    }

    #[test]
    fn healthy_primary_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let primary = LocalBlobStore::open(dir.path().join("primary")).unwrap();
        let store = FallbackBlobStore::new(primary, dir.path().join("cache")).unwrap();
        let h = store.put(b"photo").unwrap();
        assert!(!is_local_handle(&h));
        assert_eq!(store.get(&h).unwrap(), b"photo");
    }

    #[test]
    fn failing_primary_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackBlobStore::new(DownStore, dir.path()).unwrap();
        let h = store.put(b"photo").unwrap();
        assert!(is_local_handle(&h));
        assert_eq!(store.get(&h).unwrap(), b"photo");
    }

    #[test]
    fn local_handles_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackBlobStore::new(DownStore, dir.path()).unwrap();
        let a = store.put(b"one").unwrap();
        let b = store.put(b"two").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn missing_local_handle_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackBlobStore::new(DownStore, dir.path()).unwrap();
        let h = MediaHandle::new("local_1_abc").unwrap();
        assert!(matches!(store.get(&h), Err(BlobError::NotFound(_))));
    }
}
