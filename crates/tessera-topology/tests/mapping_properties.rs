//! Property tests for mapping canonicalization and membership transforms.
//!
//! Downstream signature aggregation requires that every proposer serializes
//! an equal member set identically, so canonicalization and change
//! application must be invariant under input ordering.

use proptest::prelude::*;
use tessera_core::{ParticipantId, PartyId};
use tessera_topology::mapping::{
    HostingParticipant, ParticipantChange, PartyToParticipant, Permission,
};
use tessera_topology::thresholds;

fn hosting() -> impl Strategy<Value = Vec<HostingParticipant>> {
    prop::collection::btree_map(0u8..32, any::<bool>(), 1..8).prop_map(|members| {
        members
            .into_iter()
            .map(|(id, submits)| {
                HostingParticipant::new(
                    ParticipantId::new(format!("p{id:02}")),
                    if submits {
                        Permission::Submission
                    } else {
                        Permission::Observation
                    },
                )
            })
            .collect()
    })
}

fn hosting_and_permutation(
) -> impl Strategy<Value = (Vec<HostingParticipant>, Vec<HostingParticipant>)> {
    hosting().prop_flat_map(|original| {
        let shuffled = Just(original.clone()).prop_shuffle();
        shuffled.prop_map(move |s| (original.clone(), s))
    })
}

fn mapping(hosting: Vec<HostingParticipant>) -> PartyToParticipant {
    let threshold = thresholds::party_confirmation_threshold(&hosting);
    PartyToParticipant::new(PartyId::new("alice"), threshold, hosting).unwrap()
}

proptest! {
    #[test]
    fn construction_is_invariant_under_input_order(
        (original, permuted) in hosting_and_permutation()
    ) {
        let a = mapping(original);
        let b = mapping(permuted);
        prop_assert_eq!(&a, &b);
        prop_assert!(a.is_equivalent_to(&b));
        // Canonical order is sorted by participant id.
        for pair in a.hosting().windows(2) {
            prop_assert!(pair[0].participant < pair[1].participant);
        }
    }

    #[test]
    fn confirmation_threshold_counts_submitters(hosting in hosting()) {
        let submitters = hosting
            .iter()
            .filter(|h| h.permission == Permission::Submission)
            .count() as u32;
        let m = mapping(hosting);
        prop_assert_eq!(m.threshold(), submitters.max(1));
    }

    #[test]
    fn adding_a_participant_is_idempotent(
        hosting in hosting(),
        id in 0u8..40,
        submits in any::<bool>(),
    ) {
        let permission = if submits {
            Permission::Submission
        } else {
            Permission::Observation
        };
        let change = ParticipantChange::Add(ParticipantId::new(format!("p{id:02}")), permission);
        let once = change.apply(&mapping(hosting)).unwrap();
        let twice = change.apply(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn the_same_change_on_permuted_bases_yields_one_proposal_identity(
        (original, permuted) in hosting_and_permutation(),
        id in 32u8..40,
    ) {
        // Two proposers starting from differently ordered copies of the same
        // base must produce mappings that match as one proposal: equal
        // participant set and equal recomputed threshold.
        let change = ParticipantChange::Add(
            ParticipantId::new(format!("p{id:02}")),
            Permission::Observation,
        );
        let a = change.apply(&mapping(original)).unwrap();
        let b = change.apply(&mapping(permuted)).unwrap();
        prop_assert_eq!(a.participant_set(), b.participant_set());
        prop_assert_eq!(a.threshold(), b.threshold());
        prop_assert!(a.is_equivalent_to(&b));
    }

    #[test]
    fn removing_then_readding_preserves_the_remaining_set(hosting in hosting()) {
        prop_assume!(hosting.len() > 1);
        let victim = hosting[0].clone();
        let base = mapping(hosting);
        let removed = ParticipantChange::Remove(victim.participant.clone())
            .apply(&base)
            .unwrap();
        prop_assert!(removed.permission_of(&victim.participant).is_none());
        let restored = ParticipantChange::Add(victim.participant.clone(), victim.permission)
            .apply(&removed)
            .unwrap();
        prop_assert!(restored.is_equivalent_to(&base));
    }
}
