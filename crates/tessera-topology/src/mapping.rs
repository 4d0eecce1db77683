//! Party-to-participant mappings.
//!
//! A mapping asserts which participants host a logical party, with what
//! permission, and how many of them must confirm on the party's behalf.
//!
//! Hosting order is canonical (sorted by participant id) and enforced at
//! construction. Downstream signature aggregation treats equal member sets in
//! different orders as distinct proposals and will not merge their
//! co-signatures, so every submitted mapping must serialize identically
//! regardless of which proposer built it. Matching still compares by member
//! set to stay robust against foreign proposers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tessera_core::{EngineError, EngineResult, ParticipantId, PartyId};

use crate::thresholds;

/// Permission level of a hosting participant. `Observation < Submission`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Permission {
    /// The participant observes the party's transactions.
    Observation,
    /// The participant may submit on the party's behalf.
    Submission,
}

/// One hosting entry of a party-to-participant mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostingParticipant {
    /// The hosting participant.
    pub participant: ParticipantId,
    /// Its permission level for this party.
    pub permission: Permission,
}

impl HostingParticipant {
    /// Convenience constructor.
    pub fn new(participant: ParticipantId, permission: Permission) -> Self {
        Self {
            participant,
            permission,
        }
    }
}

/// A versioned assertion about which participants host a party.
///
/// Construction validates the mapping invariants and sorts the hosting list
/// into canonical order; a value of this type is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyToParticipant {
    party: PartyId,
    threshold: u32,
    hosting: Vec<HostingParticipant>,
}

impl PartyToParticipant {
    /// Build a mapping, validating invariants and canonicalizing order.
    ///
    /// Fails with `FailedPrecondition` when the hosting list is empty or
    /// contains duplicates, or when the threshold is zero or exceeds the
    /// number of hosting participants.
    pub fn new(
        party: PartyId,
        threshold: u32,
        mut hosting: Vec<HostingParticipant>,
    ) -> EngineResult<Self> {
        if hosting.is_empty() {
            return Err(EngineError::failed_precondition(format!(
                "{party}: hosting participant list must not be empty"
            )));
        }
        hosting.sort_by(|a, b| a.participant.cmp(&b.participant));
        if hosting
            .windows(2)
            .any(|pair| pair[0].participant == pair[1].participant)
        {
            return Err(EngineError::failed_precondition(format!(
                "{party}: duplicate hosting participant"
            )));
        }
        if threshold == 0 || threshold as usize > hosting.len() {
            return Err(EngineError::failed_precondition(format!(
                "{party}: threshold {threshold} out of range for {} hosting participants",
                hosting.len()
            )));
        }
        Ok(Self {
            party,
            threshold,
            hosting,
        })
    }

    /// The hosted party.
    pub fn party(&self) -> &PartyId {
        &self.party
    }

    /// Minimum number of hosting participants that must confirm.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Hosting participants in canonical (id-sorted) order.
    pub fn hosting(&self) -> &[HostingParticipant] {
        &self.hosting
    }

    /// The set of hosting participant ids.
    pub fn participant_set(&self) -> BTreeSet<&ParticipantId> {
        self.hosting.iter().map(|h| &h.participant).collect()
    }

    /// The permission of a hosting participant, if it hosts this party.
    pub fn permission_of(&self, participant: &ParticipantId) -> Option<Permission> {
        self.hosting
            .iter()
            .find(|h| h.participant == *participant)
            .map(|h| h.permission)
    }

    /// Whether two mappings agree on party, participant set, per-participant
    /// permissions, and threshold, irrespective of how either hosting list
    /// was ordered before canonicalization.
    pub fn is_equivalent_to(&self, other: &PartyToParticipant) -> bool {
        // Canonical order makes structural equality set-equality.
        self == other
    }
}

/// A membership transform applied to an existing mapping.
///
/// Transforms recompute the confirmation threshold from the resulting
/// hosting list, so two proposers applying the same change to the same base
/// produce identical mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantChange {
    /// Add a participant, or adjust its permission if already hosting.
    Add(ParticipantId, Permission),
    /// Remove a hosting participant.
    Remove(ParticipantId),
    /// Change the permission of a participant that already hosts the party.
    ChangePermission(ParticipantId, Permission),
}

impl ParticipantChange {
    /// Apply this change to `base`, producing the target mapping.
    ///
    /// Idempotent: applying the change to a mapping that already reflects it
    /// returns an equal mapping. Removing a participant that does not host
    /// the party, or removing the last hosting participant, is a
    /// `FailedPrecondition`: a logic fault the caller must re-derive from,
    /// not a transient condition.
    pub fn apply(&self, base: &PartyToParticipant) -> EngineResult<PartyToParticipant> {
        let mut hosting = base.hosting.clone();
        match self {
            ParticipantChange::Add(participant, permission) => {
                match hosting.iter_mut().find(|h| h.participant == *participant) {
                    Some(entry) => entry.permission = *permission,
                    None => hosting.push(HostingParticipant::new(participant.clone(), *permission)),
                }
            }
            ParticipantChange::Remove(participant) => {
                let before = hosting.len();
                hosting.retain(|h| h.participant != *participant);
                if hosting.len() == before {
                    return Err(EngineError::failed_precondition(format!(
                        "{}: {participant} does not host the party",
                        base.party
                    )));
                }
            }
            ParticipantChange::ChangePermission(participant, permission) => {
                match hosting.iter_mut().find(|h| h.participant == *participant) {
                    Some(entry) => entry.permission = *permission,
                    None => {
                        return Err(EngineError::failed_precondition(format!(
                            "{}: {participant} does not host the party",
                            base.party
                        )));
                    }
                }
            }
        }
        let threshold = thresholds::party_confirmation_threshold(&hosting);
        PartyToParticipant::new(base.party.clone(), threshold, hosting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    fn mapping(hosting: Vec<(&str, Permission)>, threshold: u32) -> PartyToParticipant {
        PartyToParticipant::new(
            PartyId::new("alice"),
            threshold,
            hosting
                .into_iter()
                .map(|(id, perm)| HostingParticipant::new(p(id), perm))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn construction_canonicalizes_hosting_order() {
        let a = mapping(
            vec![("p2", Permission::Observation), ("p1", Permission::Submission)],
            1,
        );
        let b = mapping(
            vec![("p1", Permission::Submission), ("p2", Permission::Observation)],
            1,
        );
        assert_eq!(a, b);
        assert_eq!(a.hosting()[0].participant, p("p1"));
    }

    #[test]
    fn empty_hosting_is_rejected() {
        let result = PartyToParticipant::new(PartyId::new("alice"), 1, vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn threshold_must_not_exceed_hosting_count() {
        let result = PartyToParticipant::new(
            PartyId::new("alice"),
            2,
            vec![HostingParticipant::new(p("p1"), Permission::Submission)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_hosting_participants_are_rejected() {
        let result = PartyToParticipant::new(
            PartyId::new("alice"),
            1,
            vec![
                HostingParticipant::new(p("p1"), Permission::Submission),
                HostingParticipant::new(p("p1"), Permission::Observation),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn add_observer_recomputes_threshold_from_submitters() {
        // [A(Submission)] threshold 1, add B as observer: the confirmation
        // threshold stays at the submitter count.
        let base = mapping(vec![("pA", Permission::Submission)], 1);
        let target = ParticipantChange::Add(p("pB"), Permission::Observation)
            .apply(&base)
            .unwrap();
        assert_eq!(target.hosting().len(), 2);
        assert_eq!(target.threshold(), 1);
        assert_eq!(target.permission_of(&p("pB")), Some(Permission::Observation));
    }

    #[test]
    fn add_is_idempotent() {
        let base = mapping(
            vec![("pA", Permission::Submission), ("pB", Permission::Observation)],
            1,
        );
        let change = ParticipantChange::Add(p("pB"), Permission::Observation);
        assert_eq!(change.apply(&base).unwrap(), base);
    }

    #[test]
    fn promoting_an_observer_raises_the_threshold() {
        let base = mapping(
            vec![("pA", Permission::Submission), ("pB", Permission::Observation)],
            1,
        );
        let promoted = ParticipantChange::ChangePermission(p("pB"), Permission::Submission)
            .apply(&base)
            .unwrap();
        assert_eq!(promoted.permission_of(&p("pB")), Some(Permission::Submission));
        assert_eq!(promoted.threshold(), 2);
    }

    #[test]
    fn changing_permission_of_a_non_host_fails_precondition() {
        let base = mapping(vec![("pA", Permission::Submission)], 1);
        let result = ParticipantChange::ChangePermission(p("pB"), Permission::Observation)
            .apply(&base);
        assert!(matches!(
            result,
            Err(EngineError::FailedPrecondition { .. })
        ));
    }

    #[test]
    fn remove_missing_participant_fails_precondition() {
        let base = mapping(vec![("pA", Permission::Submission)], 1);
        let result = ParticipantChange::Remove(p("pB")).apply(&base);
        assert!(matches!(
            result,
            Err(EngineError::FailedPrecondition { .. })
        ));
    }

    #[test]
    fn remove_last_host_fails_precondition() {
        let base = mapping(vec![("pA", Permission::Submission)], 1);
        let result = ParticipantChange::Remove(p("pA")).apply(&base);
        assert!(matches!(
            result,
            Err(EngineError::FailedPrecondition { .. })
        ));
    }

    #[test]
    fn permission_levels_are_ordered() {
        assert!(Permission::Observation < Permission::Submission);
    }
}
