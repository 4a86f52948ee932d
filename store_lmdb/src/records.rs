//! LMDB implementation of RecordStore.
//!
//! Keys are the raw `REPORT_<id>` / `USER_<id>` strings. Values are the
//! bincode encoding of [`StoredRecord`] (version + JSON bytes).

use std::collections::HashSet;
use std::path::Path;

use heed::RoTxn;

use roadwatch_store::{
    RecordKey, RecordKind, RecordStore, StoreError, StoredRecord, WriteBatch,
};

use crate::{LmdbEnvironment, LmdbError};

pub struct LmdbRecordStore {
    env: LmdbEnvironment,
}

impl LmdbRecordStore {
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        Ok(Self {
            env: LmdbEnvironment::open(path, map_size)?,
        })
    }

    pub fn environment(&self) -> &LmdbEnvironment {
        &self.env
    }

    fn read(&self, txn: &RoTxn, key: &RecordKey) -> Result<Option<StoredRecord>, LmdbError> {
        match self.env.records_db.get(txn, key.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }
}

impl RecordStore for LmdbRecordStore {
    fn get(&self, key: &RecordKey) -> Result<Option<StoredRecord>, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.read(&rtxn, key)?)
    }

    fn put(&self, key: &RecordKey, bytes: Vec<u8>) -> Result<u64, StoreError> {
        let mut wtxn = self.env.env.write_txn().map_err(LmdbError::from)?;
        let version = self.read(&wtxn, key)?.map(|r| r.version).unwrap_or(0) + 1;
        let value = bincode::serialize(&StoredRecord { version, bytes }).map_err(LmdbError::from)?;
        self.env
            .records_db
            .put(&mut wtxn, key.as_bytes(), &value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(version)
    }

    fn scan(&self, kind: RecordKind) -> Result<Vec<(RecordKey, StoredRecord)>, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let mut out = Vec::new();
        let iter = self.env.records_db.iter(&rtxn).map_err(LmdbError::from)?;
        for result in iter {
            let (key, val) = result.map_err(LmdbError::from)?;
            let key_str =
                std::str::from_utf8(key).map_err(|e| LmdbError::Serialization(e.to_string()))?;
            if !key_str.starts_with(kind.prefix()) {
                continue;
            }
            let record: StoredRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            out.push((RecordKey::parse(key_str)?, record));
        }
        Ok(out)
    }

    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        // Dropping the transaction on any early return aborts it.
        let mut wtxn = self.env.env.write_txn().map_err(LmdbError::from)?;
        let mut seen = HashSet::new();
        for entry in batch.entries() {
            if !seen.insert(&entry.key) {
                return Err(StoreError::Backend(format!(
                    "key {} appears twice in one batch",
                    entry.key
                )));
            }
            let found = self.read(&wtxn, &entry.key)?.map(|r| r.version).unwrap_or(0);
            if found != entry.expected_version {
                return Err(StoreError::VersionConflict {
                    key: entry.key.to_string(),
                    expected: entry.expected_version,
                    found,
                });
            }
            let value = bincode::serialize(&StoredRecord {
                version: entry.expected_version + 1,
                bytes: entry.bytes.clone(),
            })
            .map_err(LmdbError::from)?;
            self.env
                .records_db
                .put(&mut wtxn, entry.key.as_bytes(), &value)
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "lmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadwatch_store::RecordStoreExt;
    use roadwatch_types::{Account, PrincipalId, ReportId, Timestamp};

    fn open_temp() -> (tempfile::TempDir, LmdbRecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbRecordStore::open(dir.path(), 10 * 1024 * 1024).unwrap();
        (dir, store)
    }

    fn account(id: &str, tokens: u64) -> Account {
        Account::new(PrincipalId::new(id).unwrap(), tokens, 70, Timestamp::EPOCH)
    }

    #[test]
    fn put_and_get() {
        let (_dir, store) = open_temp();
        let key = RecordKey::report(&ReportId::new("r1").unwrap());
        assert!(store.get(&key).unwrap().is_none());
        assert_eq!(store.put(&key, b"hello".to_vec()).unwrap(), 1);
        assert_eq!(store.put(&key, b"again".to_vec()).unwrap(), 2);
        let rec = store.get(&key).unwrap().unwrap();
        assert_eq!(rec.version, 2);
        assert_eq!(rec.bytes, b"again");
    }

    #[test]
    fn batch_is_atomic_on_conflict() {
        let (_dir, store) = open_temp();
        let mut first = WriteBatch::new();
        first.stage_account(&account("a", 50), 0).unwrap();
        store.commit(&first).unwrap();

        let mut batch = WriteBatch::new();
        batch.stage_account(&account("b", 50), 0).unwrap();
        // Stale: "a" is at version 1, not 0.
        batch.stage_account(&account("a", 60), 0).unwrap();
        let err = store.commit(&batch).unwrap_err();
        assert!(err.is_conflict());

        assert!(store.load_account(&PrincipalId::new("b").unwrap()).unwrap().is_none());
        let a = store.load_account(&PrincipalId::new("a").unwrap()).unwrap().unwrap();
        assert_eq!(a.record.token_balance, 50);
        assert_eq!(a.version, 1);
    }

    #[test]
    fn scan_separates_kinds() {
        let (_dir, store) = open_temp();
        store
            .put(&RecordKey::report(&ReportId::new("r1").unwrap()), b"{}".to_vec())
            .unwrap();
        let mut batch = WriteBatch::new();
        batch.stage_account(&account("a", 1), 0).unwrap();
        batch.stage_account(&account("b", 2), 0).unwrap();
        store.commit(&batch).unwrap();

        assert_eq!(store.scan(RecordKind::Report).unwrap().len(), 1);
        let accounts = store.all_accounts().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id.as_str(), "a");
    }

    #[test]
    fn reopen_preserves_records_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LmdbRecordStore::open(dir.path(), 10 * 1024 * 1024).unwrap();
            let mut batch = WriteBatch::new();
            batch.stage_account(&account("a", 7), 0).unwrap();
            store.commit(&batch).unwrap();
        }
        let store = LmdbRecordStore::open(dir.path(), 10 * 1024 * 1024).unwrap();
        assert_eq!(store.environment().schema_version().unwrap(), 1);
        let a = store.load_account(&PrincipalId::new("a").unwrap()).unwrap().unwrap();
        assert_eq!(a.record.token_balance, 7);
    }
}
