//! Weighted quorum thresholds
//!
//! All comparisons use integer cross multiplication in `u128`, never
//! division or floating point, so the result is exact for any `u64` weight.

use super::Weight;
use serde::{Deserialize, Serialize};

/// Fraction of total weight a partition must carry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumThreshold {
    /// Strictly more than 1/2
    Majority,
    /// Strictly more than 2/3 (BFT safety bound)
    #[default]
    SuperMajority,
}

impl QuorumThreshold {
    /// Check whether `part` out of `total` satisfies this threshold
    ///
    /// A zero total never satisfies any threshold.
    pub fn is_satisfied_by(&self, part: Weight, total: Weight) -> bool {
        if total == 0 {
            return false;
        }
        let part = part as u128;
        let total = total as u128;
        match self {
            QuorumThreshold::Majority => part * 2 > total,
            QuorumThreshold::SuperMajority => part * 3 > total * 2,
        }
    }

    /// Smallest weight that satisfies the threshold (the quorum `Q`)
    pub fn minimum_weight(&self, total: Weight) -> Weight {
        if total == 0 {
            return 0;
        }
        let total = total as u128;
        let min = match self {
            QuorumThreshold::Majority => total / 2 + 1,
            QuorumThreshold::SuperMajority => (total * 2) / 3 + 1,
        };
        min as Weight
    }
}
