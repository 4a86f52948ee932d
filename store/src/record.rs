//! Stored values and write batches.

use crate::RecordKey;
use serde::{Deserialize, Serialize};

/// Raw bytes of a record plus its version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub version: u64,
    pub bytes: Vec<u8>,
}

/// A decoded record together with the version it was read at.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

impl<T> Versioned<T> {
    pub fn into_inner(self) -> T {
        self.record
    }
}

/// One conditional write inside a [`WriteBatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchEntry {
    pub key: RecordKey,
    /// Version the writer read. `0` means the key must not exist yet.
    pub expected_version: u64,
    pub bytes: Vec<u8>,
}

/// A set of conditional writes committed all-or-nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    entries: Vec<BatchEntry>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: RecordKey, expected_version: u64, bytes: Vec<u8>) {
        self.entries.push(BatchEntry {
            key,
            expected_version,
            bytes,
        });
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
