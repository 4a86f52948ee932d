//! In-memory keyspace with versioned, all-or-nothing batch application.
//!
//! Shared by every backend that keeps the whole collection in memory and
//! persists it as a unit (JSON document, content-addressed snapshot, the
//! in-memory test store).

use crate::{RecordKey, RecordKind, StoreError, StoredRecord, WriteBatch};
use std::collections::{BTreeMap, HashSet};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collection {
    records: BTreeMap<RecordKey, StoredRecord>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&StoredRecord> {
        self.records.get(key)
    }

    pub fn version_of(&self, key: &RecordKey) -> u64 {
        self.records.get(key).map(|r| r.version).unwrap_or(0)
    }

    /// Unconditional write. Returns the new version.
    pub fn put(&mut self, key: RecordKey, bytes: Vec<u8>) -> u64 {
        let version = self.version_of(&key) + 1;
        self.records.insert(key, StoredRecord { version, bytes });
        version
    }

    /// Restore a record verbatim, e.g. while loading a persisted collection.
    pub fn insert_raw(&mut self, key: RecordKey, record: StoredRecord) {
        self.records.insert(key, record);
    }

    pub fn scan(&self, kind: RecordKind) -> Vec<(RecordKey, StoredRecord)> {
        self.records
            .iter()
            .filter(|(k, _)| k.kind() == kind)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &StoredRecord)> {
        self.records.iter()
    }

    /// Check every expected version without mutating anything.
    pub fn check(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for entry in batch.entries() {
            if !seen.insert(&entry.key) {
                return Err(StoreError::Backend(format!(
                    "key {} appears twice in one batch",
                    entry.key
                )));
            }
            let found = self.version_of(&entry.key);
            if found != entry.expected_version {
                return Err(StoreError::VersionConflict {
                    key: entry.key.to_string(),
                    expected: entry.expected_version,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Check, then apply every entry. On error nothing is changed.
    pub fn apply(&mut self, batch: &WriteBatch) -> Result<(), StoreError> {
        self.check(batch)?;
        for entry in batch.entries() {
            self.records.insert(
                entry.key.clone(),
                StoredRecord {
                    version: entry.expected_version + 1,
                    bytes: entry.bytes.clone(),
                },
            );
        }
        Ok(())
    }
}
