//! Opening the configured record and blob stores.

use std::sync::Arc;

use roadwatch_store::{BlobError, BlobStore, RecordStore, StoreError};
use roadwatch_store_fs::{ContentAddressedStore, FallbackBlobStore, JsonFileStore, LocalBlobStore};
use roadwatch_store_lmdb::LmdbRecordStore;

use crate::config::{StorageBackend, StorageConfig};

/// Open one specific backend.
pub fn open_backend(
    backend: StorageBackend,
    config: &StorageConfig,
) -> Result<Arc<dyn RecordStore>, StoreError> {
    std::fs::create_dir_all(&config.data_dir)?;
    let store: Arc<dyn RecordStore> = match backend {
        StorageBackend::Lmdb => Arc::new(LmdbRecordStore::open(
            &config.lmdb_dir(),
            config.lmdb_map_size,
        )?),
        StorageBackend::Json => Arc::new(JsonFileStore::open(config.json_path())?),
        StorageBackend::ContentAddressed => {
            let blobs = LocalBlobStore::open(config.snapshot_dir())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            Arc::new(ContentAddressedStore::open(blobs, config.head_path())?)
        }
    };
    Ok(store)
}

/// Open the configured backend, falling back to `config.fallback` if the
/// primary cannot be opened.
///
/// Returns the store and whether the fallback is in use.
pub fn open_record_store(
    config: &StorageConfig,
) -> Result<(Arc<dyn RecordStore>, bool), StoreError> {
    match open_backend(config.backend, config) {
        Ok(store) => {
            tracing::info!(backend = config.backend.as_str(), data_dir = %config.data_dir.display(), "record store opened");
            Ok((store, false))
        }
        Err(primary_err) => match config.fallback {
            Some(fallback) => {
                tracing::warn!(
                    backend = config.backend.as_str(),
                    fallback = fallback.as_str(),
                    error = %primary_err,
                    "primary record store unavailable, opening fallback"
                );
                let store = open_backend(fallback, config)?;
                Ok((store, true))
            }
            None => Err(primary_err),
        },
    }
}

/// Local media store wrapped with the degraded-mode cache.
pub fn open_media_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, BlobError> {
    let primary = LocalBlobStore::open(config.media_dir())?;
    Ok(Arc::new(FallbackBlobStore::new(
        primary,
        config.media_cache_dir(),
    )?))
}
