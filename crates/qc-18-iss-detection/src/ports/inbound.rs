//! Driving Ports (API - Inbound)

use crate::domain::{
    EpochHash, HashValidityStatus, NodeId, ReportDisposition, Round, SoftwareVersion, StateHash,
};
use crate::error::IssResult;
use crate::events::IssNotification;

/// Primary ISS detection API
///
/// Driven by the consensus pipeline (round boundaries), the hashing
/// pipeline (self hashes) and gossip (peer signatures). Every operation
/// returns the notifications it emitted so callers and tests can observe
/// them without a sink.
pub trait IssDetectorApi: Send + Sync {
    /// A consensus round completed locally.
    ///
    /// Rounds must arrive in order. Rounds that fall out of the window are
    /// decided and classified before this returns.
    fn round_completed(&self, round: Round) -> IssResult<Vec<IssNotification>>;

    /// A peer's signed state hash arrived.
    ///
    /// Invalid or untimely reports are dropped, never errors.
    fn handle_peer_signature(
        &self,
        node_id: NodeId,
        round: Round,
        hash: StateHash,
        software_version: SoftwareVersion,
        epoch_hash: EpochHash,
    ) -> IssResult<(ReportDisposition, Vec<IssNotification>)>;

    /// The local hash of a completed round is known.
    fn self_hash_computed(&self, round: Round, hash: StateHash) -> IssResult<Vec<IssNotification>>;

    /// State was replaced out of band (reconnect or restart from a saved state).
    ///
    /// Tracked rounds are discarded without being classified.
    fn overriding_state_loaded(
        &self,
        round: Round,
        hash: StateHash,
    ) -> IssResult<Vec<IssNotification>>;

    /// Status of a tracked round
    fn round_status(&self, round: Round) -> Option<HashValidityStatus>;
}
