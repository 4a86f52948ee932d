//! Fundamental types for Roadwatch.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! principals, reports, accounts, timestamps, engine parameters, and the
//! clock and identity seams the engine is injected with.

pub mod account;
pub mod error;
pub mod identity;
pub mod params;
pub mod principal;
pub mod report;
pub mod time;

pub use account::{Account, REPUTATION_MAX, REPUTATION_MIN};
pub use error::ValidationError;
pub use identity::{IdentityError, IdentityGateway};
pub use params::{EngineParams, RewardSchedule};
pub use principal::PrincipalId;
pub use report::{
    Category, Coordinates, Location, MediaHandle, Report, ReportId, ReportStatus, Resolution,
};
pub use time::{Clock, SystemClock, Timestamp};
