#![deny(missing_docs)]
#![doc = "Core identifiers, structured errors and seeded randomness shared by the NEST crates."]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod rng;

pub use errors::{ErrorInfo, NestError};
pub use rng::RngHandle;

macro_rules! raw_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new identifier from its raw integer representation.
            pub fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw integer representation of the identifier.
            pub fn as_raw(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

raw_id!(
    /// Identifier of a stimulus group, the unit shown in one round.
    StimulusGroupId,
    "sg"
);
raw_id!(
    /// Identifier of a stimulus-vote-group, the unit a single vote targets.
    StimulusVoteGroupId,
    "svg"
);
raw_id!(
    /// Identifier of a stimulus (one media file).
    StimulusId,
    "st"
);
raw_id!(
    /// Identifier of a subject taking part in an experiment.
    SubjectId,
    "subject"
);
raw_id!(
    /// Identifier of a persisted session.
    SessionId,
    "session"
);
raw_id!(
    /// Identifier of a persisted experiment.
    ExperimentId,
    "experiment"
);

/// Zero based index of a round within a session.
pub type RoundId = u32;
