//! Record keys.
//!
//! Keys are strings of the form `REPORT_<id>` and `USER_<id>`. The prefix
//! scheme keeps both kinds in one keyspace while letting a backend scan one
//! kind with a prefix match.

use crate::StoreError;
use roadwatch_types::{PrincipalId, ReportId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Report,
    Account,
}

impl RecordKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            RecordKind::Report => "REPORT_",
            RecordKind::Account => "USER_",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn report(id: &ReportId) -> Self {
        Self(format!("{}{}", RecordKind::Report.prefix(), id))
    }

    pub fn account(id: &PrincipalId) -> Self {
        Self(format!("{}{}", RecordKind::Account.prefix(), id))
    }

    /// Parse a raw stored key back into a typed key.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let known = [RecordKind::Report, RecordKind::Account]
            .iter()
            .any(|k| raw.len() > k.prefix().len() && raw.starts_with(k.prefix()));
        if known {
            Ok(Self(raw.to_string()))
        } else {
            Err(StoreError::Corruption(format!("unrecognized key {raw:?}")))
        }
    }

    pub fn kind(&self) -> RecordKind {
        if self.0.starts_with(RecordKind::Report.prefix()) {
            RecordKind::Report
        } else {
            RecordKind::Account
        }
    }

    /// The id part, without the kind prefix.
    pub fn id(&self) -> &str {
        &self.0[self.kind().prefix().len()..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_kind_prefix() {
        let r = RecordKey::report(&ReportId::new("rpt_1").unwrap());
        let u = RecordKey::account(&PrincipalId::new("alice").unwrap());
        assert_eq!(r.as_str(), "REPORT_rpt_1");
        assert_eq!(u.as_str(), "USER_alice");
        assert_eq!(r.kind(), RecordKind::Report);
        assert_eq!(u.kind(), RecordKind::Account);
        assert_eq!(r.id(), "rpt_1");
        assert_eq!(u.id(), "alice");
    }

    #[test]
    fn parse_round_trips_and_rejects_garbage() {
        let k = RecordKey::account(&PrincipalId::new("bob").unwrap());
        assert_eq!(RecordKey::parse(k.as_str()).unwrap(), k);
        assert!(RecordKey::parse("TRAFFIC_1").is_err());
        assert!(RecordKey::parse("USER_").is_err());
    }
}
