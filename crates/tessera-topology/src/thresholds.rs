//! Threshold functions derived from cluster size.
//!
//! All quorum-like parameters are computed from one place so that every
//! proposer derives identical targets. The synchronizer tolerates `f`
//! Byzantine nodes out of `n = 3f + 1`.

use crate::mapping::{HostingParticipant, Permission};

/// Number of faulty nodes tolerated by a cluster of `n` nodes.
pub fn fault_tolerance(n: usize) -> u32 {
    (n.saturating_sub(1) / 3) as u32
}

/// Number of sequencers a client must agree with before trusting a read:
/// one more than the tolerated number of faults.
pub fn sequencer_trust_threshold(n: usize) -> u32 {
    fault_tolerance(n) + 1
}

/// Submission amplification factor for a cluster of `n` sequencers: send
/// each submission to `f + 1` sequencers, capped at 2 to bound write
/// amplification on large clusters.
pub fn submission_amplification(n: usize) -> u32 {
    (fault_tolerance(n) + 1).min(2).max(1)
}

/// Confirmation threshold for a party hosting list: every participant with
/// `Submission` permission must confirm, and at least one participant always
/// must.
pub fn party_confirmation_threshold(hosting: &[HostingParticipant]) -> u32 {
    let submitters = hosting
        .iter()
        .filter(|h| h.permission == Permission::Submission)
        .count() as u32;
    submitters.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::ParticipantId;

    #[test]
    fn fault_tolerance_steps_at_three_f_plus_one() {
        assert_eq!(fault_tolerance(1), 0);
        assert_eq!(fault_tolerance(3), 0);
        assert_eq!(fault_tolerance(4), 1);
        assert_eq!(fault_tolerance(7), 2);
    }

    #[test]
    fn trust_threshold_exceeds_fault_tolerance() {
        for n in 1..=10 {
            assert!(sequencer_trust_threshold(n) > fault_tolerance(n));
            assert!(sequencer_trust_threshold(n) as usize <= n);
        }
    }

    #[test]
    fn amplification_is_bounded() {
        assert_eq!(submission_amplification(1), 1);
        assert_eq!(submission_amplification(4), 2);
        assert_eq!(submission_amplification(13), 2);
    }

    #[test]
    fn confirmation_threshold_counts_submitters() {
        let hosting = vec![
            HostingParticipant::new(ParticipantId::new("p1"), Permission::Submission),
            HostingParticipant::new(ParticipantId::new("p2"), Permission::Observation),
            HostingParticipant::new(ParticipantId::new("p3"), Permission::Submission),
        ];
        assert_eq!(party_confirmation_threshold(&hosting), 2);
    }

    #[test]
    fn observer_only_hosting_still_needs_one_confirmation() {
        let hosting = vec![HostingParticipant::new(
            ParticipantId::new("p1"),
            Permission::Observation,
        )];
        assert_eq!(party_confirmation_threshold(&hosting), 1);
    }
}
