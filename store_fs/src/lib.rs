//! File-backed storage for Roadwatch.
//!
//! - [`JsonFileStore`]: the whole record collection in one JSON document,
//!   rewritten via temp file + rename on every commit.
//! - [`ContentAddressedStore`]: the collection serialized into a blob whose
//!   content hash is recorded in a `HEAD` pointer file.
//! - [`LocalBlobStore`]: blake2b-addressed files in a directory.
//! - [`FallbackBlobStore`]: primary blob store with a local cache that takes
//!   over when the primary fails.

pub mod blob;
pub mod document;
pub mod fallback;
pub mod fsutil;
pub mod json;
pub mod snapshot;

pub use blob::{content_hash, LocalBlobStore};
pub use fallback::FallbackBlobStore;
pub use json::JsonFileStore;
pub use snapshot::ContentAddressedStore;
