//! Reward computation: tokens and reputation owed for each event.
//!
//! Pure: the caller loads the accounts, applies the deltas with
//! [`apply_delta`] and writes everything back in one batch.
//!
//! | Event                         | Paid to                   |
//! |-------------------------------|---------------------------|
//! | Submission accepted           | submitter                 |
//! | Partial corroboration         | the voter                 |
//! | Quorum completion             | every corroborator        |
//! | Admin override / any rejection| nobody                    |

use crate::Transition;
use roadwatch_types::{Account, PrincipalId, Report, RewardSchedule};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardEvent {
    SubmissionAccepted,
    PartialCorroboration,
    QuorumCompletion,
    AdminOverride,
    Rejection,
}

/// A credit owed to one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDelta {
    pub account: PrincipalId,
    pub tokens: u64,
    pub reputation: i32,
}

impl RewardDelta {
    fn is_zero(&self) -> bool {
        self.tokens == 0 && self.reputation == 0
    }
}

/// Deltas for a single event. `actor` is the principal whose action
/// triggered it (submitter or voter).
pub fn compute_rewards(
    schedule: &RewardSchedule,
    event: RewardEvent,
    actor: &PrincipalId,
    report: &Report,
) -> Vec<RewardDelta> {
    let deltas = match event {
        RewardEvent::SubmissionAccepted => vec![RewardDelta {
            account: actor.clone(),
            tokens: schedule.submit_tokens,
            reputation: schedule.submit_reputation,
        }],
        RewardEvent::PartialCorroboration => vec![RewardDelta {
            account: actor.clone(),
            tokens: schedule.partial_tokens,
            reputation: schedule.partial_reputation,
        }],
        RewardEvent::QuorumCompletion => report
            .corroborators
            .iter()
            .map(|c| RewardDelta {
                account: c.clone(),
                tokens: schedule.completion_tokens,
                reputation: schedule.completion_reputation,
            })
            .collect(),
        RewardEvent::AdminOverride | RewardEvent::Rejection => Vec::new(),
    };
    deltas.into_iter().filter(|d| !d.is_zero()).collect()
}

/// Events a lifecycle transition triggers.
pub fn events_for(transition: &Transition) -> &'static [RewardEvent] {
    match transition {
        Transition::Corroborated { .. } => &[RewardEvent::PartialCorroboration],
        // The voter who completes quorum earns the partial reward as well.
        Transition::QuorumReached { .. } => &[
            RewardEvent::PartialCorroboration,
            RewardEvent::QuorumCompletion,
        ],
        Transition::Overridden { .. } => &[RewardEvent::AdminOverride],
        Transition::Rejected { .. } | Transition::AdminRejected { .. } => {
            &[RewardEvent::Rejection]
        }
    }
}

/// All deltas for a transition, merged so each account appears once, in
/// first-appearance order.
pub fn rewards_for(
    schedule: &RewardSchedule,
    transition: &Transition,
    actor: &PrincipalId,
    report: &Report,
) -> Vec<RewardDelta> {
    let mut merged: Vec<RewardDelta> = Vec::new();
    for event in events_for(transition) {
        for delta in compute_rewards(schedule, *event, actor, report) {
            match merged.iter_mut().find(|m| m.account == delta.account) {
                Some(existing) => {
                    existing.tokens = existing.tokens.saturating_add(delta.tokens);
                    existing.reputation = existing.reputation.saturating_add(delta.reputation);
                }
                None => merged.push(delta),
            }
        }
    }
    merged
}

/// Credit an account. Tokens saturate, reputation is clamped.
pub fn apply_delta(account: &mut Account, delta: &RewardDelta) {
    debug_assert_eq!(account.id, delta.account);
    account.credit(delta.tokens, delta.reputation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReportLifecycle;
    use roadwatch_types::{Category, Coordinates, Location, ReportId, Timestamp};

    fn p(s: &str) -> PrincipalId {
        PrincipalId::new(s).unwrap()
    }

    fn report(corroborators: &[&str]) -> Report {
        let mut r = Report::new_pending(
            ReportId::new("r1").unwrap(),
            p("u0"),
            Category::Accident,
            String::new(),
            Location {
                name: String::new(),
                address: String::new(),
                coordinates: Coordinates::new(0.0, 0.0).unwrap(),
            },
            None,
            Timestamp::EPOCH,
        );
        r.corroborators = corroborators.iter().map(|s| p(s)).collect();
        r.corroboration_count = r.corroborators.len() as u32;
        r
    }

    #[test]
    fn submission_pays_submitter() {
        let d = compute_rewards(
            &RewardSchedule::default(),
            RewardEvent::SubmissionAccepted,
            &p("u0"),
            &report(&[]),
        );
        assert_eq!(
            d,
            vec![RewardDelta {
                account: p("u0"),
                tokens: 10,
                reputation: 0
            }]
        );
    }

    #[test]
    fn partial_vote_pays_voter_only() {
        let t = Transition::Corroborated { count: 2 };
        let d = rewards_for(&RewardSchedule::default(), &t, &p("u2"), &report(&["u1", "u2"]));
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].account, p("u2"));
        assert_eq!((d[0].tokens, d[0].reputation), (2, 1));
    }

    #[test]
    fn quorum_pays_completion_to_all_and_partial_to_trigger() {
        let mut r = report(&[]);
        let lc = ReportLifecycle::new(3, true);
        lc.corroborate(&mut r, &p("a"), true, Timestamp::EPOCH).unwrap();
        lc.corroborate(&mut r, &p("b"), true, Timestamp::EPOCH).unwrap();
        let t = lc.corroborate(&mut r, &p("c"), true, Timestamp::EPOCH).unwrap();

        let d = rewards_for(&RewardSchedule::default(), &t, &p("c"), &r);
        assert_eq!(d.len(), 3);
        let c = d.iter().find(|x| x.account == p("c")).unwrap();
        assert_eq!((c.tokens, c.reputation), (7, 3));
        let a = d.iter().find(|x| x.account == p("a")).unwrap();
        assert_eq!((a.tokens, a.reputation), (5, 2));
        assert!(d.iter().all(|x| x.account != p("u0")));
    }

    #[test]
    fn override_and_rejection_pay_nothing() {
        let r = report(&["u1"]);
        let s = RewardSchedule::default();
        assert!(rewards_for(&s, &Transition::Overridden { by: p("admin") }, &p("admin"), &r).is_empty());
        assert!(rewards_for(&s, &Transition::Rejected { by: p("u2") }, &p("u2"), &r).is_empty());
        assert!(rewards_for(&s, &Transition::AdminRejected { by: p("admin") }, &p("admin"), &r).is_empty());
    }

    #[test]
    fn zero_schedule_produces_no_deltas() {
        let s = RewardSchedule {
            submit_tokens: 0,
            submit_reputation: 0,
            ..RewardSchedule::default()
        };
        assert!(compute_rewards(&s, RewardEvent::SubmissionAccepted, &p("u0"), &report(&[])).is_empty());
    }

    #[test]
    fn apply_clamps_reputation() {
        let mut acct = Account::new(p("a"), 0, 99, Timestamp::EPOCH);
        apply_delta(
            &mut acct,
            &RewardDelta {
                account: p("a"),
                tokens: 5,
                reputation: 2,
            },
        );
        assert_eq!(acct.reputation, 100);
        assert_eq!(acct.token_balance, 5);
    }
}
