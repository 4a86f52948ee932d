//! Engine parameters: quorum, reward schedule, starting balances.
//!
//! Every value here is configuration, not a constant baked into the state
//! machine. Deployments observed two quorum values (5 with rejection votes,
//! 3 on the ledger-only variant without them); both are expressible.

use serde::{Deserialize, Serialize};

/// Token and reputation deltas paid for each reward event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSchedule {
    /// Paid to the submitter when a report is accepted.
    pub submit_tokens: u64,
    pub submit_reputation: i32,

    /// Paid to each voter for an affirmative vote.
    pub partial_tokens: u64,
    pub partial_reputation: i32,

    /// Paid to every corroborator when quorum is reached.
    pub completion_tokens: u64,
    pub completion_reputation: i32,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            submit_tokens: 10,
            submit_reputation: 0,
            partial_tokens: 2,
            partial_reputation: 1,
            completion_tokens: 5,
            completion_reputation: 2,
        }
    }
}

/// All parameters the verification engine consults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Distinct corroborators needed to move a report to `verified`.
    pub quorum: u32,

    /// Whether a negative vote rejects a pending report.
    /// When disabled, negative votes are refused.
    pub rejection_enabled: bool,

    /// Balance of an implicitly created account.
    pub starting_tokens: u64,
    pub starting_reputation: i32,

    /// Longest accepted description, in characters.
    pub max_description_len: usize,

    pub rewards: RewardSchedule,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            quorum: 5,
            rejection_enabled: true,
            starting_tokens: 50,
            starting_reputation: 70,
            max_description_len: 2000,
            rewards: RewardSchedule::default(),
        }
    }
}

impl EngineParams {
    /// Parameters of the ledger-only deployment: quorum of three, no rejection votes.
    pub fn ledger_variant() -> Self {
        Self {
            quorum: 3,
            rejection_enabled: false,
            ..Self::default()
        }
    }

    /// Check internal consistency. Returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.quorum == 0 {
            return Err("quorum must be at least 1".into());
        }
        if self.max_description_len == 0 {
            return Err("max_description_len must be at least 1".into());
        }
        Ok(())
    }
}
