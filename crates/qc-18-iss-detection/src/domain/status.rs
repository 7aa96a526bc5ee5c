//! Hash validity status of a round

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of validating one round's state hash against the network.
///
/// State machine:
/// ```text
/// [UNDECIDED] ──quorum on self hash──→ [VALID]
///      │
///      ├──quorum on other hash──→ [SELF_ISS]
///      │
///      ├──quorum unreachable──→ [CATASTROPHIC_ISS | CATASTROPHIC_LACK_OF_DATA]
///      │
///      └──evicted from window──→ [LACK_OF_DATA]
/// ```
///
/// Once a status leaves `Undecided` it never changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HashValidityStatus {
    /// Not enough information yet
    #[default]
    Undecided,
    /// This node agrees with the consensus hash
    Valid,
    /// The network agreed on a hash different from ours
    SelfIss,
    /// The network cannot reach quorum on any hash; our own hash is known
    CatastrophicIss,
    /// The round left the window before a decision could be made
    LackOfData,
    /// The network cannot reach quorum and our own hash never arrived
    CatastrophicLackOfData,
}

impl HashValidityStatus {
    pub fn is_decided(&self) -> bool {
        !matches!(self, HashValidityStatus::Undecided)
    }

    pub fn is_catastrophic(&self) -> bool {
        matches!(
            self,
            HashValidityStatus::CatastrophicIss | HashValidityStatus::CatastrophicLackOfData
        )
    }

    /// Stable label used for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            HashValidityStatus::Undecided => "undecided",
            HashValidityStatus::Valid => "valid",
            HashValidityStatus::SelfIss => "self_iss",
            HashValidityStatus::CatastrophicIss => "catastrophic_iss",
            HashValidityStatus::LackOfData => "lack_of_data",
            HashValidityStatus::CatastrophicLackOfData => "catastrophic_lack_of_data",
        }
    }
}

impl fmt::Display for HashValidityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
