//! Incoming events for ISS detection

use crate::domain::{EpochHash, NodeId, Round, SoftwareVersion, StateHash};
use serde::{Deserialize, Serialize};

/// A peer's signed state hash for one round, as delivered by gossip
///
/// The signature has already been verified upstream. `sender` is taken
/// from the envelope, never from the signed body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSignaturePayload {
    pub sender: NodeId,
    pub round: Round,
    pub state_hash: StateHash,
    pub software_version: SoftwareVersion,
    pub epoch_hash: EpochHash,
}

impl StateSignaturePayload {
    pub fn new(
        sender: NodeId,
        round: Round,
        state_hash: StateHash,
        software_version: SoftwareVersion,
        epoch_hash: EpochHash,
    ) -> Self {
        Self {
            sender,
            round,
            state_hash,
            software_version,
            epoch_hash,
        }
    }
}
