//! Typed access to reports and accounts on top of [`RecordStore`].
//!
//! Records are JSON-encoded so every backend stores the same bytes and a
//! collection can be inspected with ordinary tools.

use crate::{RecordKey, RecordKind, RecordStore, StoreError, StoredRecord, Versioned, WriteBatch};
use roadwatch_types::{Account, PrincipalId, Report, ReportId};
use serde::de::DeserializeOwned;
use serde::Serialize;

fn decode<T: DeserializeOwned>(key: &RecordKey, record: &StoredRecord) -> Result<T, StoreError> {
    serde_json::from_slice(&record.bytes)
        .map_err(|e| StoreError::Corruption(format!("{key}: {e}")))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(value)?)
}

pub trait RecordStoreExt: RecordStore {
    /// Load a report. Unknown ids are [`StoreError::NotFound`].
    fn load_report(&self, id: &ReportId) -> Result<Versioned<Report>, StoreError> {
        let key = RecordKey::report(id);
        let stored = self
            .get(&key)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(Versioned {
            version: stored.version,
            record: decode(&key, &stored)?,
        })
    }

    /// Load a report if it exists.
    fn find_report(&self, id: &ReportId) -> Result<Option<Versioned<Report>>, StoreError> {
        match self.load_report(id) {
            Ok(r) => Ok(Some(r)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load an account if it exists.
    fn load_account(&self, id: &PrincipalId) -> Result<Option<Versioned<Account>>, StoreError> {
        let key = RecordKey::account(id);
        match self.get(&key)? {
            Some(stored) => Ok(Some(Versioned {
                version: stored.version,
                record: decode(&key, &stored)?,
            })),
            None => Ok(None),
        }
    }

    fn all_reports(&self) -> Result<Vec<Report>, StoreError> {
        self.scan(RecordKind::Report)?
            .iter()
            .map(|(k, v)| decode(k, v))
            .collect()
    }

    fn all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.scan(RecordKind::Account)?
            .iter()
            .map(|(k, v)| decode(k, v))
            .collect()
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}

impl WriteBatch {
    /// Stage a report write conditional on `expected_version`.
    pub fn stage_report(&mut self, report: &Report, expected_version: u64) -> Result<(), StoreError> {
        self.push(RecordKey::report(&report.id), expected_version, encode(report)?);
        Ok(())
    }

    /// Stage an account write conditional on `expected_version`.
    pub fn stage_account(&mut self, account: &Account, expected_version: u64) -> Result<(), StoreError> {
        self.push(RecordKey::account(&account.id), expected_version, encode(account)?);
        Ok(())
    }
}
