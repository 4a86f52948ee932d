//! Binary object storage for report images.
//!
//! The engine never interprets media; it only keeps the handle a blob store
//! returned.

use roadwatch_types::MediaHandle;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("blob store unavailable: {0}")]
    Unavailable(String),

    #[error("blob content does not match handle {0}")]
    Corrupt(String),

    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Store bytes, get a content handle back.
pub trait BlobStore: Send + Sync {
    fn put(&self, bytes: &[u8]) -> Result<MediaHandle, BlobError>;
    fn get(&self, handle: &MediaHandle) -> Result<Vec<u8>, BlobError>;
}
