//! Shared utilities for Roadwatch.

pub mod logging;

pub use logging::{init_logging, LogFormat};
