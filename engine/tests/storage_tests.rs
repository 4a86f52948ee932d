//! The engine over each on-disk backend, plus backend selection and
//! degraded fallback.

use std::sync::Arc;

use roadwatch_engine::storage::{open_backend, open_media_store, open_record_store};
use roadwatch_engine::{
    EngineConfig, EngineSettings, NewReport, StaticIdentityGateway, StorageBackend,
    StorageConfig, VerificationEngine,
};
use roadwatch_nullables::NullBlobStore;
use roadwatch_store::{BlobStore, RecordStore};
use roadwatch_store_fs::FallbackBlobStore;
use roadwatch_types::{Category, Coordinates, Location, PrincipalId, ReportStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn p(s: &str) -> PrincipalId {
    PrincipalId::new(s).unwrap()
}

fn storage(dir: &std::path::Path, backend: StorageBackend) -> StorageConfig {
    StorageConfig {
        backend,
        lmdb_map_size: 16 * 1024 * 1024,
        ..StorageConfig::default()
    }
    .with_data_dir(dir)
}

fn engine(store: Arc<dyn RecordStore>) -> VerificationEngine {
    let config = EngineConfig {
        params: roadwatch_types::EngineParams {
            quorum: 2,
            ..Default::default()
        },
        ..EngineConfig::default()
    };
    let identity = Arc::new(StaticIdentityGateway::from_config(&config.identity));
    VerificationEngine::new(store, identity, EngineSettings::from_config(&config))
}

async fn verify_one_report(store: Arc<dyn RecordStore>) {
    let engine = engine(store);
    let new = NewReport::new(
        p("u0"),
        Category::Construction,
        Location {
            name: "Chang'an Avenue".into(),
            address: String::new(),
            coordinates: Coordinates::new(116.39, 39.90).unwrap(),
        },
    );
    let id = engine.submit(new).await.unwrap().id;
    engine.corroborate(&id, &p("u1"), true).await.unwrap();
    let report = engine.corroborate(&id, &p("u2"), true).await.unwrap();
    assert_eq!(report.status, ReportStatus::Verified);
    assert_eq!(engine.account(&p("u2")).await.unwrap().token_balance, 57);
}

// ---------------------------------------------------------------------------
// 1. Each backend survives a restart
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_backend_persists_across_reopen() {
    for backend in [
        StorageBackend::Lmdb,
        StorageBackend::Json,
        StorageBackend::ContentAddressed,
    ] {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = storage(dir.path(), backend);

        verify_one_report(open_backend(backend, &config).unwrap()).await;

        let reopened = engine(open_backend(backend, &config).unwrap());
        let accounts = reopened.accounts().await.unwrap();
        assert_eq!(accounts.len(), 3, "{}", backend.as_str());
        let verified = reopened
            .query(roadwatch_engine::ReportQuery::default().with_status(ReportStatus::Verified))
            .await
            .unwrap();
        assert_eq!(verified.count(), 1, "{}", backend.as_str());
    }
}

// ---------------------------------------------------------------------------
// 2. Degraded fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unopenable_primary_falls_back_to_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = storage(dir.path(), StorageBackend::Lmdb);
    // A regular file where the LMDB directory should be.
    std::fs::write(config.lmdb_dir(), b"not a directory").unwrap();

    let (store, degraded) = open_record_store(&config).unwrap();
    assert!(degraded);
    assert_eq!(store.backend_name(), "json");
    verify_one_report(store).await;
    assert!(config.json_path().exists());
}

#[test]
fn fallback_can_be_disabled() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = storage(dir.path(), StorageBackend::Lmdb);
    config.fallback = None;
    std::fs::write(config.lmdb_dir(), b"not a directory").unwrap();
    assert!(open_record_store(&config).is_err());
}

#[test]
fn healthy_primary_is_used() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = storage(dir.path(), StorageBackend::ContentAddressed);
    let (store, degraded) = open_record_store(&config).unwrap();
    assert!(!degraded);
    assert_eq!(store.backend_name(), "content_addressed");
}

// ---------------------------------------------------------------------------
// 3. Media
// ---------------------------------------------------------------------------

#[test]
fn media_store_round_trips_images() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = storage(dir.path(), StorageBackend::Json);
    let media = open_media_store(&config).unwrap();
    let handle = media.put(b"jpeg bytes").unwrap();
    assert_eq!(media.get(&handle).unwrap(), b"jpeg bytes");
}

#[test]
fn unreachable_media_primary_degrades_to_local_cache() {
    let dir = tempfile::tempdir().expect("temp dir");
    let primary = NullBlobStore::new();
    primary.set_unavailable(true);
    let media = FallbackBlobStore::new(primary, dir.path().join("cache")).unwrap();

    let handle = media.put(b"photo").unwrap();
    assert!(handle.as_str().starts_with("local_"));
    assert_eq!(media.get(&handle).unwrap(), b"photo");
    assert!(media.primary().is_empty());
}
