//! Report verification rules.
//!
//! Pure functions and state transitions, no I/O:
//! 1. **Lifecycle**: `pending → verified` by quorum of distinct corroborators
//!    or by administrator override; `pending → rejected` by a single negative
//!    vote (when enabled) or by an administrator. Both outcomes are terminal.
//! 2. **Rewards**: token and reputation deltas owed for each transition.
//!
//! The engine loads a report, runs it through [`ReportLifecycle`], asks
//! [`rewards_for`] what to pay, and commits everything in one batch.

pub mod error;
pub mod lifecycle;
pub mod rewards;

pub use error::LifecycleError;
pub use lifecycle::{check_invariants, ReportLifecycle, Transition};
pub use rewards::{apply_delta, compute_rewards, events_for, rewards_for, RewardDelta, RewardEvent};
