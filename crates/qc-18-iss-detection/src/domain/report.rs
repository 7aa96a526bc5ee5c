//! Hash reports and what happened to them

use super::{NodeId, Round, StateHash, Weight};
use serde::{Deserialize, Serialize};

/// One node's claim about the state hash of a round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashReport {
    pub node_id: NodeId,
    pub weight: Weight,
    pub hash: StateHash,
    pub round: Round,
}

/// Effect of a report on a round validator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportOutcome {
    /// The report changed the partition state (false for replays)
    pub applied: bool,
    /// This report moved the round out of `Undecided`
    pub decided: bool,
    /// The round had already decided on a consensus hash and this report disagrees with it
    pub late_dissent: bool,
}

/// Why a peer report was accepted or dropped.
///
/// Dropping is expected behaviour, never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportDisposition {
    /// Counted toward the round
    Accepted,
    /// Counted, and it decided the round
    Decided,
    /// Same node already reported the same hash
    Duplicate,
    /// Signed by a different software version
    ForeignSoftwareVersion,
    /// Signed under a different epoch
    ForeignEpoch,
    /// Sender is not in the address book
    UnknownNode,
    /// Round is configured to be ignored
    IgnoredRound,
    /// Round already left the window
    RoundTooOld,
    /// Round has not completed locally yet
    RoundTooNew,
    /// Round falls in a gap left by a reconnect
    RoundNotTracked,
}

impl ReportDisposition {
    /// Stable label used for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportDisposition::Accepted => "accepted",
            ReportDisposition::Decided => "decided",
            ReportDisposition::Duplicate => "duplicate",
            ReportDisposition::ForeignSoftwareVersion => "foreign_software_version",
            ReportDisposition::ForeignEpoch => "foreign_epoch",
            ReportDisposition::UnknownNode => "unknown_node",
            ReportDisposition::IgnoredRound => "ignored_round",
            ReportDisposition::RoundTooOld => "round_too_old",
            ReportDisposition::RoundTooNew => "round_too_new",
            ReportDisposition::RoundNotTracked => "round_not_tracked",
        }
    }
}
