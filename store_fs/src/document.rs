//! On-disk document format shared by the JSON and snapshot backends.
//!
//! ```json
//! { "schema_version": 1,
//!   "records": { "USER_alice": { "version": 2, "record": { ... } } } }
//! ```
//!
//! Record bodies are embedded as JSON values, so records written through
//! these backends must themselves be JSON.

use roadwatch_store::{Collection, RecordKey, StoreError, StoredRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Document {
    schema_version: u32,
    records: BTreeMap<String, DocumentRecord>,
}

#[derive(Serialize, Deserialize)]
struct DocumentRecord {
    version: u64,
    record: serde_json::Value,
}

pub fn encode(collection: &Collection) -> Result<Vec<u8>, StoreError> {
    let mut records = BTreeMap::new();
    for (key, stored) in collection.iter() {
        let record: serde_json::Value = serde_json::from_slice(&stored.bytes)
            .map_err(|e| StoreError::Serialization(format!("{key} is not JSON: {e}")))?;
        records.insert(
            key.to_string(),
            DocumentRecord {
                version: stored.version,
                record,
            },
        );
    }
    let doc = Document {
        schema_version: SCHEMA_VERSION,
        records,
    };
    Ok(serde_json::to_vec_pretty(&doc)?)
}

pub fn decode(bytes: &[u8]) -> Result<Collection, StoreError> {
    let doc: Document = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Corruption(format!("unreadable document: {e}")))?;
    if doc.schema_version != SCHEMA_VERSION {
        return Err(StoreError::Corruption(format!(
            "unsupported schema version {}",
            doc.schema_version
        )));
    }
    let mut collection = Collection::new();
    for (raw_key, rec) in doc.records {
        let key = RecordKey::parse(&raw_key)?;
        let bytes = serde_json::to_vec(&rec.record)?;
        collection.insert_raw(
            key,
            StoredRecord {
                version: rec.version,
                bytes,
            },
        );
    }
    Ok(collection)
}
