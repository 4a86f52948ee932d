//! Report lifecycle state machine.

use crate::LifecycleError;
use roadwatch_types::{EngineParams, PrincipalId, Report, ReportStatus, Resolution, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What a successful lifecycle step did to the report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transition {
    /// Vote recorded, quorum not yet reached.
    Corroborated { count: u32 },
    /// This vote reached quorum; the report is now verified.
    QuorumReached { corroborators: Vec<PrincipalId> },
    /// A negative vote rejected the report.
    Rejected { by: PrincipalId },
    /// An administrator verified the report directly.
    Overridden { by: PrincipalId },
    /// An administrator rejected the report directly.
    AdminRejected { by: PrincipalId },
}

impl Transition {
    /// Whether the report left `pending` with this step.
    pub fn is_final(&self) -> bool {
        !matches!(self, Transition::Corroborated { .. })
    }
}

/// Applies votes and administrative decisions to a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportLifecycle {
    pub quorum: u32,
    pub rejection_enabled: bool,
}

impl ReportLifecycle {
    pub fn new(quorum: u32, rejection_enabled: bool) -> Self {
        Self {
            quorum: quorum.max(1),
            rejection_enabled,
        }
    }

    pub fn from_params(params: &EngineParams) -> Self {
        Self::new(params.quorum, params.rejection_enabled)
    }

    fn ensure_pending(report: &Report) -> Result<(), LifecycleError> {
        if report.status.is_terminal() {
            return Err(LifecycleError::ReportClosed {
                id: report.id.to_string(),
                status: report.status,
            });
        }
        Ok(())
    }

    /// Record a vote by `voter`.
    ///
    /// Affirmative votes accumulate until quorum. A negative vote, when
    /// rejection is enabled, closes the report immediately: confirming needs
    /// a quorum, rejecting needs one voter.
    pub fn corroborate(
        &self,
        report: &mut Report,
        voter: &PrincipalId,
        affirmative: bool,
        now: Timestamp,
    ) -> Result<Transition, LifecycleError> {
        Self::ensure_pending(report)?;
        if *voter == report.submitter {
            return Err(LifecycleError::SelfVote(voter.to_string()));
        }
        if report.has_corroborated(voter) {
            return Err(LifecycleError::DuplicateVote(voter.to_string()));
        }

        if !affirmative {
            if !self.rejection_enabled {
                return Err(LifecycleError::RejectionDisabled);
            }
            report.status = ReportStatus::Rejected;
            report.resolved_at = Some(now);
            report.resolution = Some(Resolution::NegativeVote {
                voter: voter.clone(),
            });
            return Ok(Transition::Rejected { by: voter.clone() });
        }

        report.corroborators.push(voter.clone());
        report.corroboration_count = report.corroborators.len() as u32;

        if report.corroboration_count >= self.quorum {
            report.status = ReportStatus::Verified;
            report.verified_at = Some(now);
            report.resolved_at = Some(now);
            report.resolution = Some(Resolution::Quorum);
            Ok(Transition::QuorumReached {
                corroborators: report.corroborators.clone(),
            })
        } else {
            Ok(Transition::Corroborated {
                count: report.corroboration_count,
            })
        }
    }

    /// Force a pending report to `verified`, regardless of its count.
    ///
    /// The admin joins the corroborators unless already present or the
    /// submitter of the report.
    pub fn admin_verify(
        &self,
        report: &mut Report,
        admin: &PrincipalId,
        now: Timestamp,
    ) -> Result<Transition, LifecycleError> {
        Self::ensure_pending(report)?;
        if *admin != report.submitter && !report.has_corroborated(admin) {
            report.corroborators.push(admin.clone());
            report.corroboration_count = report.corroborators.len() as u32;
        }
        report.status = ReportStatus::Verified;
        report.verified_at = Some(now);
        report.resolved_at = Some(now);
        report.resolution = Some(Resolution::AdminOverride {
            admin: admin.clone(),
        });
        Ok(Transition::Overridden { by: admin.clone() })
    }

    /// Force a pending report to `rejected`.
    pub fn admin_reject(
        &self,
        report: &mut Report,
        admin: &PrincipalId,
        now: Timestamp,
    ) -> Result<Transition, LifecycleError> {
        Self::ensure_pending(report)?;
        report.status = ReportStatus::Rejected;
        report.resolved_at = Some(now);
        report.resolution = Some(Resolution::AdminRejection {
            admin: admin.clone(),
        });
        Ok(Transition::AdminRejected { by: admin.clone() })
    }
}

/// Structural checks run on every report before it is written.
///
/// `quorum` is the value in force for the step being committed; a verified
/// report resolved by quorum must have at least that many corroborators.
pub fn check_invariants(report: &Report, quorum: u32) -> Result<(), LifecycleError> {
    let fail = |detail: String| LifecycleError::InvariantViolated {
        id: report.id.to_string(),
        detail,
    };

    if report.corroboration_count as usize != report.corroborators.len() {
        return Err(fail(format!(
            "count {} != {} corroborators",
            report.corroboration_count,
            report.corroborators.len()
        )));
    }
    let mut seen = HashSet::new();
    for c in &report.corroborators {
        if !seen.insert(c) {
            return Err(fail(format!("{c} corroborated twice")));
        }
    }
    if report.has_corroborated(&report.submitter) {
        return Err(fail("submitter is a corroborator".into()));
    }

    match (report.status, &report.resolution) {
        (ReportStatus::Pending, None) => {
            if report.verified_at.is_some() || report.resolved_at.is_some() {
                return Err(fail("pending report carries resolution timestamps".into()));
            }
        }
        (ReportStatus::Verified, Some(Resolution::Quorum)) => {
            if report.corroboration_count < quorum {
                return Err(fail(format!(
                    "verified by quorum with {} of {quorum}",
                    report.corroboration_count
                )));
            }
            if report.verified_at.is_none() {
                return Err(fail("verified without verified_at".into()));
            }
        }
        (ReportStatus::Verified, Some(Resolution::AdminOverride { .. })) => {
            if report.verified_at.is_none() {
                return Err(fail("verified without verified_at".into()));
            }
        }
        (ReportStatus::Rejected, Some(Resolution::NegativeVote { .. }))
        | (ReportStatus::Rejected, Some(Resolution::AdminRejection { .. })) => {
            if report.verified_at.is_some() {
                return Err(fail("rejected report has verified_at".into()));
            }
        }
        (status, resolution) => {
            return Err(fail(format!(
                "status {status} inconsistent with resolution {resolution:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadwatch_types::{Category, Coordinates, Location, ReportId};

    fn p(s: &str) -> PrincipalId {
        PrincipalId::new(s).unwrap()
    }

    fn pending(submitter: &str) -> Report {
        Report::new_pending(
            ReportId::new("r1").unwrap(),
            p(submitter),
            Category::Congestion,
            "queue at the ramp".into(),
            Location {
                name: "Ring Road 3".into(),
                address: String::new(),
                coordinates: Coordinates::new(116.4, 39.9).unwrap(),
            },
            None,
            Timestamp::from_millis(1),
        )
    }

    fn lifecycle() -> ReportLifecycle {
        ReportLifecycle::new(5, true)
    }

    // ── Corroboration ───────────────────────────────────────────────────

    #[test]
    fn votes_accumulate_until_quorum() {
        let lc = lifecycle();
        let mut r = pending("u0");
        for (i, voter) in ["u1", "u2", "u3", "u4"].iter().enumerate() {
            let t = lc.corroborate(&mut r, &p(voter), true, Timestamp::from_millis(10)).unwrap();
            assert_eq!(t, Transition::Corroborated { count: i as u32 + 1 });
            assert!(r.is_pending());
        }
        let t = lc.corroborate(&mut r, &p("u5"), true, Timestamp::from_millis(20)).unwrap();
        assert!(matches!(t, Transition::QuorumReached { ref corroborators } if corroborators.len() == 5));
        assert_eq!(r.status, ReportStatus::Verified);
        assert_eq!(r.verified_at, Some(Timestamp::from_millis(20)));
        assert_eq!(r.resolution, Some(Resolution::Quorum));
        check_invariants(&r, 5).unwrap();
    }

    #[test]
    fn duplicate_vote_rejected_without_change() {
        let lc = lifecycle();
        let mut r = pending("u0");
        lc.corroborate(&mut r, &p("u1"), true, Timestamp::EPOCH).unwrap();
        let before = r.clone();
        let err = lc.corroborate(&mut r, &p("u1"), true, Timestamp::EPOCH).unwrap_err();
        assert!(matches!(err, LifecycleError::DuplicateVote(_)));
        assert_eq!(r, before);
    }

    #[test]
    fn self_vote_rejected() {
        let mut r = pending("u0");
        let err = lifecycle()
            .corroborate(&mut r, &p("u0"), true, Timestamp::EPOCH)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::SelfVote(_)));
    }

    #[test]
    fn terminal_report_refuses_votes() {
        let lc = lifecycle();
        let mut r = pending("u0");
        lc.admin_verify(&mut r, &p("admin"), Timestamp::EPOCH).unwrap();
        let err = lc.corroborate(&mut r, &p("u1"), true, Timestamp::EPOCH).unwrap_err();
        assert!(matches!(err, LifecycleError::ReportClosed { status: ReportStatus::Verified, .. }));
    }

    // ── Rejection ───────────────────────────────────────────────────────

    #[test]
    fn single_negative_vote_rejects_even_with_corroborators() {
        let lc = lifecycle();
        let mut r = pending("u0");
        for voter in ["u1", "u2", "u3", "u4"] {
            lc.corroborate(&mut r, &p(voter), true, Timestamp::EPOCH).unwrap();
        }
        let t = lc.corroborate(&mut r, &p("u5"), false, Timestamp::from_millis(3)).unwrap();
        assert_eq!(t, Transition::Rejected { by: p("u5") });
        assert_eq!(r.status, ReportStatus::Rejected);
        assert_eq!(r.corroboration_count, 4);
        assert!(r.verified_at.is_none());
        check_invariants(&r, 5).unwrap();
    }

    #[test]
    fn negative_vote_refused_when_disabled() {
        let lc = ReportLifecycle::new(3, false);
        let mut r = pending("u0");
        let err = lc.corroborate(&mut r, &p("u1"), false, Timestamp::EPOCH).unwrap_err();
        assert_eq!(err, LifecycleError::RejectionDisabled);
        assert!(r.is_pending());
    }

    // ── Administrative decisions ────────────────────────────────────────

    #[test]
    fn override_with_one_corroborator() {
        let lc = lifecycle();
        let mut r = pending("u0");
        lc.corroborate(&mut r, &p("u1"), true, Timestamp::EPOCH).unwrap();
        lc.admin_verify(&mut r, &p("admin"), Timestamp::from_millis(9)).unwrap();
        assert_eq!(r.status, ReportStatus::Verified);
        assert!(r.admin_overridden());
        assert_eq!(r.corroborators, vec![p("u1"), p("admin")]);
        assert_eq!(r.corroboration_count, 2);
        check_invariants(&r, 5).unwrap();
    }

    #[test]
    fn submitting_admin_not_added_as_corroborator() {
        let mut r = pending("admin");
        lifecycle().admin_verify(&mut r, &p("admin"), Timestamp::EPOCH).unwrap();
        assert!(r.corroborators.is_empty());
        check_invariants(&r, 5).unwrap();
    }

    #[test]
    fn admin_already_corroborating_not_duplicated() {
        let lc = lifecycle();
        let mut r = pending("u0");
        lc.corroborate(&mut r, &p("admin"), true, Timestamp::EPOCH).unwrap();
        lc.admin_verify(&mut r, &p("admin"), Timestamp::EPOCH).unwrap();
        assert_eq!(r.corroboration_count, 1);
    }

    #[test]
    fn admin_reject_closes_report() {
        let lc = lifecycle();
        let mut r = pending("u0");
        let t = lc.admin_reject(&mut r, &p("admin"), Timestamp::EPOCH).unwrap();
        assert!(t.is_final());
        assert_eq!(r.status, ReportStatus::Rejected);
        assert!(lc.admin_verify(&mut r, &p("admin"), Timestamp::EPOCH).is_err());
    }

    // ── Invariants ──────────────────────────────────────────────────────

    #[test]
    fn invariant_catches_count_mismatch() {
        let mut r = pending("u0");
        r.corroboration_count = 3;
        assert!(check_invariants(&r, 5).is_err());
    }

    #[test]
    fn invariant_catches_verified_below_quorum() {
        let mut r = pending("u0");
        r.status = ReportStatus::Verified;
        r.verified_at = Some(Timestamp::EPOCH);
        r.resolution = Some(Resolution::Quorum);
        assert!(check_invariants(&r, 5).is_err());
    }

    #[test]
    fn invariant_catches_submitter_corroborating() {
        let mut r = pending("u0");
        r.corroborators.push(p("u0"));
        r.corroboration_count = 1;
        assert!(check_invariants(&r, 5).is_err());
    }
}
