//! Abstract storage traits for Roadwatch.
//!
//! Every record backend (LMDB, JSON file, content-addressed snapshots,
//! in-memory for testing) implements [`RecordStore`]. Binary media goes
//! through [`BlobStore`]. The engine depends only on these traits.

pub mod blob;
pub mod collection;
pub mod error;
pub mod key;
pub mod record;
pub mod typed;

pub use blob::{BlobError, BlobStore};
pub use collection::Collection;
pub use error::StoreError;
pub use key::{RecordKey, RecordKind};
pub use record::{BatchEntry, StoredRecord, Versioned, WriteBatch};
pub use typed::RecordStoreExt;

/// Durable key-value persistence for reports and accounts.
///
/// Every record carries a version that starts at 1 and increases by one on
/// each write. [`RecordStore::commit`] applies a batch atomically and only if
/// every entry's expected version still matches, which is how concurrent
/// writers (threads or processes) detect each other.
pub trait RecordStore: Send + Sync {
    /// Fetch the current value of a key, if any.
    fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError>;

    /// Unconditional overwrite. Returns the new version.
    fn put(&self, key: &RecordKey, bytes: Vec<u8>) -> Result<u64, StoreError>;

    /// All records of one kind, ordered by key.
    fn scan(&self, kind: RecordKind) -> Result<Vec<(RecordKey, StoredRecord)>, StoreError>;

    /// Apply every entry or none of them.
    ///
    /// Fails with [`StoreError::VersionConflict`] if any entry's expected
    /// version differs from the stored one (0 meaning "must not exist").
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str {
        "unknown"
    }
}
