//! Content-addressed blob files.

use std::path::{Path, PathBuf};

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use roadwatch_store::{BlobError, BlobStore};
use roadwatch_types::MediaHandle;

use crate::fsutil;

type Blake2b256 = Blake2b<U32>;

/// Hex-encoded 256-bit Blake2b hash of `data`.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    hex::encode(output)
}

fn is_content_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Blobs stored as `<dir>/<blake2b-256 hex>`.
///
/// Writing the same bytes twice yields the same handle and one file.
pub struct LocalBlobStore {
    dir: PathBuf,
}

impl LocalBlobStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<MediaHandle, BlobError> {
        let hash = content_hash(bytes);
        let path = self.dir.join(&hash);
        if !path.exists() {
            fsutil::write_atomic(&path, bytes)?;
        }
        MediaHandle::new(hash).map_err(|e| BlobError::Unavailable(e.to_string()))
    }

    fn get(&self, handle: &MediaHandle) -> Result<Vec<u8>, BlobError> {
        if !is_content_hash(handle.as_str()) {
            return Err(BlobError::NotFound(handle.to_string()));
        }
        let bytes = fsutil::read_optional(&self.dir.join(handle.as_str()))?
            .ok_or_else(|| BlobError::NotFound(handle.to_string()))?;
        if content_hash(&bytes) != handle.as_str().to_ascii_lowercase() {
            return Err(BlobError::Corrupt(handle.to_string()));
        }
        Ok(bytes)
    }
}
