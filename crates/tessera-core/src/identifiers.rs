//! Typed identifiers for synchronizer members, parties, and domains.
//!
//! Every identifier is a string-backed newtype so that a participant id can
//! never be passed where a party id is expected. `MemberId` is the tagged
//! union used wherever an API accepts any node kind (pruning status entries,
//! proposal signers).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "::{}"), self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

string_id!(
    /// A participant node hosting parties on the synchronizer.
    ParticipantId,
    "PAR"
);
string_id!(
    /// A mediator node of the synchronizer.
    MediatorId,
    "MED"
);
string_id!(
    /// A sequencer node of the synchronizer.
    SequencerId,
    "SEQ"
);
string_id!(
    /// A logical party hosted by one or more participants.
    PartyId,
    "PTY"
);

/// Any synchronizer member, regardless of node kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MemberId {
    /// A participant node.
    Participant(ParticipantId),
    /// A mediator node.
    Mediator(MediatorId),
    /// A sequencer node.
    Sequencer(SequencerId),
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberId::Participant(id) => id.fmt(f),
            MemberId::Mediator(id) => id.fmt(f),
            MemberId::Sequencer(id) => id.fmt(f),
        }
    }
}

impl From<ParticipantId> for MemberId {
    fn from(id: ParticipantId) -> Self {
        MemberId::Participant(id)
    }
}

impl From<MediatorId> for MemberId {
    fn from(id: MediatorId) -> Self {
        MemberId::Mediator(id)
    }
}

impl From<SequencerId> for MemberId {
    fn from(id: SequencerId) -> Self {
        MemberId::Sequencer(id)
    }
}

/// Human-readable alias for a domain connection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DomainAlias(String);

impl DomainAlias {
    /// Wrap a raw alias string.
    pub fn new(alias: impl Into<String>) -> Self {
        Self(alias.into())
    }

    /// The raw alias string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DomainAlias {
    fn from(alias: &str) -> Self {
        Self::new(alias)
    }
}

/// Identifier of a scheduled synchronizer migration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct MigrationId(pub u64);

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "migration-{}", self.0)
    }
}
