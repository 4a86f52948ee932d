//! LMDB record store backend for Roadwatch.
//!
//! Implements [`roadwatch_store::RecordStore`] using the `heed` LMDB bindings.
//! Every batch commit is a single LMDB write transaction, so report and
//! account writes of one engine operation land together or not at all, and
//! LMDB's single-writer lock serializes competing processes.

pub mod environment;
pub mod error;
pub mod records;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use records::LmdbRecordStore;
