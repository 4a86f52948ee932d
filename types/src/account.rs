//! Per-principal token and reputation accounts.

use crate::{PrincipalId, ReportId, Timestamp};
use serde::{Deserialize, Serialize};

/// Lowest reputation an account can hold.
pub const REPUTATION_MIN: i32 = 0;
/// Highest reputation an account can hold.
pub const REPUTATION_MAX: i32 = 100;

/// Token balance and reputation of one principal.
///
/// Created implicitly the first time a principal submits or corroborates;
/// never deleted by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: PrincipalId,
    pub token_balance: u64,
    /// Always within `[REPUTATION_MIN, REPUTATION_MAX]`.
    pub reputation: i32,
    /// Reports this principal submitted, oldest first.
    #[serde(default)]
    pub submitted: Vec<ReportId>,
    /// Reports this principal confirmed, oldest first.
    #[serde(default)]
    pub corroborated: Vec<ReportId>,
    pub created_at: Timestamp,
}

impl Account {
    pub fn new(
        id: PrincipalId,
        starting_tokens: u64,
        starting_reputation: i32,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            token_balance: starting_tokens,
            reputation: clamp_reputation(starting_reputation as i64),
            submitted: Vec::new(),
            corroborated: Vec::new(),
            created_at,
        }
    }

    /// Apply a reward: tokens add (saturating), reputation is clamped.
    pub fn credit(&mut self, tokens: u64, reputation: i32) {
        self.token_balance = self.token_balance.saturating_add(tokens);
        self.reputation = clamp_reputation(self.reputation as i64 + reputation as i64);
    }

    /// Remove `amount` tokens if the balance covers it.
    ///
    /// Returns `false` and leaves the balance untouched otherwise.
    pub fn try_debit(&mut self, amount: u64) -> bool {
        match self.token_balance.checked_sub(amount) {
            Some(rest) => {
                self.token_balance = rest;
                true
            }
            None => false,
        }
    }

    pub fn record_submission(&mut self, report: &ReportId) {
        if !self.submitted.contains(report) {
            self.submitted.push(report.clone());
        }
    }

    pub fn record_corroboration(&mut self, report: &ReportId) {
        if !self.corroborated.contains(report) {
            self.corroborated.push(report.clone());
        }
    }
}

fn clamp_reputation(value: i64) -> i32 {
    value.clamp(REPUTATION_MIN as i64, REPUTATION_MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(tokens: u64, reputation: i32) -> Account {
        Account::new(
            PrincipalId::new("u1").unwrap(),
            tokens,
            reputation,
            Timestamp::EPOCH,
        )
    }

    #[test]
    fn reputation_clamped_at_top() {
        let mut a = account(0, 99);
        a.credit(5, 2);
        assert_eq!(a.reputation, REPUTATION_MAX);
        assert_eq!(a.token_balance, 5);
    }

    #[test]
    fn reputation_clamped_at_bottom() {
        let mut a = account(0, 1);
        a.credit(0, -10);
        assert_eq!(a.reputation, REPUTATION_MIN);
    }

    #[test]
    fn starting_reputation_is_clamped() {
        assert_eq!(account(0, 250).reputation, REPUTATION_MAX);
        assert_eq!(account(0, -3).reputation, REPUTATION_MIN);
    }

    #[test]
    fn tokens_saturate() {
        let mut a = account(u64::MAX - 1, 50);
        a.credit(10, 0);
        assert_eq!(a.token_balance, u64::MAX);
    }

    #[test]
    fn debit_requires_sufficient_balance() {
        let mut a = account(10, 50);
        assert!(!a.try_debit(11));
        assert_eq!(a.token_balance, 10);
        assert!(a.try_debit(10));
        assert_eq!(a.token_balance, 0);
    }

    #[test]
    fn history_lists_deduplicate() {
        let mut a = account(0, 50);
        let r = ReportId::new("r1").unwrap();
        a.record_corroboration(&r);
        a.record_corroboration(&r);
        a.record_submission(&r);
        assert_eq!(a.corroborated.len(), 1);
        assert_eq!(a.submitted.len(), 1);
    }
}
