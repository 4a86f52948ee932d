use proptest::prelude::*;

use roadwatch_types::{
    Category, Coordinates, Location, PrincipalId, Report, ReportId, ReportStatus, Timestamp,
};
use roadwatch_verification::{check_invariants, ReportLifecycle, Transition};

fn fresh_report() -> Report {
    Report::new_pending(
        ReportId::new("r").unwrap(),
        PrincipalId::new("p0").unwrap(),
        Category::Construction,
        String::new(),
        Location {
            name: String::new(),
            address: String::new(),
            coordinates: Coordinates::new(10.0, 10.0).unwrap(),
        },
        None,
        Timestamp::EPOCH,
    )
}

proptest! {
    /// Any sequence of votes from a small principal pool keeps the report
    /// structurally valid, and at most one step ever finalizes it.
    #[test]
    fn arbitrary_votes_preserve_invariants(
        quorum in 1u32..7,
        rejection in any::<bool>(),
        votes in prop::collection::vec((0u8..8, prop::bool::weighted(0.85)), 0..40),
    ) {
        let lc = ReportLifecycle::new(quorum, rejection);
        let mut report = fresh_report();
        let mut finals = 0;
        for (who, affirmative) in votes {
            let voter = PrincipalId::new(format!("p{who}")).unwrap();
            if let Ok(t) = lc.corroborate(&mut report, &voter, affirmative, Timestamp::EPOCH) {
                if t.is_final() {
                    finals += 1;
                }
                if let Transition::QuorumReached { corroborators } = &t {
                    prop_assert_eq!(corroborators.len() as u32, quorum);
                }
            }
            check_invariants(&report, quorum).unwrap();
        }
        prop_assert!(finals <= 1);
        prop_assert!(report.corroboration_count <= quorum);
        if report.status == ReportStatus::Verified {
            prop_assert_eq!(report.corroboration_count, quorum);
        }
    }
}
