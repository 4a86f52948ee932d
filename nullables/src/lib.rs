//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the engine (clock, identity service, record
//! store, blob store) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including injected failures
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod blob;
pub mod clock;
pub mod identity;
pub mod store;

pub use blob::NullBlobStore;
pub use clock::NullClock;
pub use identity::NullIdentity;
pub use store::NullStore;
