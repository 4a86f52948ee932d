//! Roadwatch verification engine.
//!
//! Ties the pure verification rules to a durable record store:
//! - [`VerificationEngine`]: submit, corroborate, administrative decisions,
//!   transfers and read queries, all safe to call concurrently
//! - [`EngineConfig`]: TOML configuration for the engine, storage and identity
//! - [`storage`]: opening the configured backend, with degraded fallback
//! - [`EngineEvent`] / [`EventBus`]: post-commit notifications
//! - [`EngineMetrics`]: Prometheus counters and commit latency

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod identity;
pub mod ids;
pub mod locks;
pub mod metrics;
pub mod query;
pub mod storage;

pub use config::{ConfigError, EngineConfig, IdentityConfig, StorageBackend, StorageConfig};
pub use engine::{EngineSettings, NewReport, TransferReceipt, VerificationEngine};
pub use error::{ConflictReason, EngineError};
pub use events::{EngineEvent, EventBus};
pub use identity::StaticIdentityGateway;
pub use metrics::EngineMetrics;
pub use query::{ReportQuery, ReportSet};
