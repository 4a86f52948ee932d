//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use roadwatch_types::EngineParams;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which record store backend to open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// LMDB environment under `<data_dir>/ledger`.
    Lmdb,
    /// One JSON document at `<data_dir>/records.json`.
    Json,
    /// Snapshots in `<data_dir>/snapshots`, pointer at `<data_dir>/HEAD`.
    ContentAddressed,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Lmdb => "lmdb",
            StorageBackend::Json => "json",
            StorageBackend::ContentAddressed => "content_addressed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Backend opened when `backend` cannot be. `None` disables fallback.
    #[serde(default = "default_fallback")]
    pub fallback: Option<StorageBackend>,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Where uploaded images are stored. Defaults to `<data_dir>/media`.
    #[serde(default)]
    pub media_dir: Option<PathBuf>,

    /// Degraded-mode cache for images. Defaults to `<data_dir>/media_cache`.
    #[serde(default)]
    pub media_cache_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// When true every principal resolves; `principals` is ignored.
    #[serde(default = "default_true")]
    pub permissive: bool,

    #[serde(default)]
    pub principals: Vec<String>,

    #[serde(default)]
    pub admins: Vec<String>,
}

/// Configuration for a Roadwatch engine.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on any single store or identity call, in milliseconds.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,

    /// How often an operation is re-run after a version conflict.
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,

    /// Maximum number of engine operations in flight.
    #[serde(default = "default_max_concurrent_ops")]
    pub max_concurrent_ops: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Quorum, reward schedule, starting balances.
    #[serde(default)]
    pub params: EngineParams,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_backend() -> StorageBackend {
    StorageBackend::Lmdb
}

fn default_fallback() -> Option<StorageBackend> {
    Some(StorageBackend::Json)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./roadwatch_data")
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

fn default_true() -> bool {
    true
}

fn default_io_timeout_ms() -> u64 {
    5_000
}

fn default_max_commit_retries() -> u32 {
    8
}

fn default_max_concurrent_ops() -> usize {
    64
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl StorageConfig {
    pub fn lmdb_dir(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    pub fn json_path(&self) -> PathBuf {
        self.data_dir.join("records.json")
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn head_path(&self) -> PathBuf {
        self.data_dir.join("HEAD")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.media_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("media"))
    }

    pub fn media_cache_dir(&self) -> PathBuf {
        self.media_cache_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("media_cache"))
    }

    /// Same settings rooted at a different data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            fallback: default_fallback(),
            data_dir: default_data_dir(),
            lmdb_map_size: default_lmdb_map_size(),
            media_dir: None,
            media_cache_dir: None,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            permissive: default_true(),
            principals: Vec::new(),
            admins: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate().map_err(ConfigError::Invalid)?;
        if self.io_timeout_ms == 0 {
            return Err(ConfigError::Invalid("io_timeout_ms must be positive".into()));
        }
        if self.max_concurrent_ops == 0 {
            return Err(ConfigError::Invalid("max_concurrent_ops must be positive".into()));
        }
        if self.storage.fallback == Some(self.storage.backend) {
            return Err(ConfigError::Invalid(
                "storage.fallback must differ from storage.backend".into(),
            ));
        }
        Ok(())
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            io_timeout_ms: default_io_timeout_ms(),
            max_commit_retries: default_max_commit_retries(),
            max_concurrent_ops: default_max_concurrent_ops(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            params: EngineParams::default(),
            storage: StorageConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = EngineConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = EngineConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.params.quorum, 5);
        assert_eq!(config.storage.backend, StorageBackend::Lmdb);
        assert_eq!(config.storage.fallback, Some(StorageBackend::Json));
        assert!(config.identity.permissive);
        assert_eq!(config.log_format, "human");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            io_timeout_ms = 250

            [params]
            quorum = 3
            rejection_enabled = false

            [params.rewards]
            completion_tokens = 8

            [storage]
            backend = "content_addressed"
            data_dir = "/var/lib/roadwatch"

            [identity]
            permissive = false
            principals = ["alice", "bob"]
            admins = ["root"]
        "#;
        let config = EngineConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.io_timeout(), Duration::from_millis(250));
        assert_eq!(config.params.quorum, 3);
        assert!(!config.params.rejection_enabled);
        assert_eq!(config.params.rewards.completion_tokens, 8);
        assert_eq!(config.params.rewards.partial_tokens, 2); // default
        assert_eq!(config.storage.backend, StorageBackend::ContentAddressed);
        assert_eq!(config.storage.head_path(), PathBuf::from("/var/lib/roadwatch/HEAD"));
        assert_eq!(config.identity.admins, vec!["root".to_string()]);
    }

    #[test]
    fn zero_quorum_rejected() {
        let err = EngineConfig::from_toml_str("[params]\nquorum = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn fallback_equal_to_backend_rejected() {
        let err = EngineConfig::from_toml_str("[storage]\nbackend = \"json\"\nfallback = \"json\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
