//! Outgoing events for ISS detection

use crate::domain::{NodeId, Round, StateHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of inconsistency detected for a round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssType {
    /// This node disagrees with the network consensus
    SelfIss,
    /// Another node disagrees with the network consensus
    OtherIss,
    /// No hash reached quorum
    CatastrophicIss,
    /// The round left the window before it could be decided
    LackOfData,
}

impl IssType {
    /// Whether this notification requires the node to stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, IssType::SelfIss | IssType::CatastrophicIss)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssType::SelfIss => "self_iss",
            IssType::OtherIss => "other_iss",
            IssType::CatastrophicIss => "catastrophic_iss",
            IssType::LackOfData => "lack_of_data",
        }
    }
}

impl fmt::Display for IssType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification emitted when a round is classified as anything but valid,
/// or when a peer dissents from a valid round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssNotification {
    pub round: Round,
    pub iss_type: IssType,
    /// This node's hash, when known
    pub self_hash: Option<StateHash>,
    /// Hash agreed by quorum, when one exists
    pub consensus_hash: Option<StateHash>,
    /// Dissenting node for `OtherIss`
    pub proof_node_id: Option<NodeId>,
    /// Hash reported by `proof_node_id`
    pub node_hash: Option<StateHash>,
}

impl IssNotification {
    pub fn new(round: Round, iss_type: IssType) -> Self {
        Self {
            round,
            iss_type,
            self_hash: None,
            consensus_hash: None,
            proof_node_id: None,
            node_hash: None,
        }
    }

    pub fn with_self_hash(mut self, hash: Option<StateHash>) -> Self {
        self.self_hash = hash;
        self
    }

    pub fn with_consensus_hash(mut self, hash: Option<StateHash>) -> Self {
        self.consensus_hash = hash;
        self
    }

    /// Attach the dissenting node and the hash it reported
    pub fn with_proof(mut self, node_id: NodeId, hash: StateHash) -> Self {
        self.proof_node_id = Some(node_id);
        self.node_hash = Some(hash);
        self
    }
}

/// Platform status requested by the ISS handler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    /// Stop participating; requires operator intervention
    CatastrophicFailure,
}

/// Request sent to the platform status controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransitionRequest {
    pub status: NodeStatus,
    pub round: Round,
    pub reason: IssType,
}

impl StatusTransitionRequest {
    pub fn catastrophic_failure(round: Round, reason: IssType) -> Self {
        Self {
            status: NodeStatus::CatastrophicFailure,
            round,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_types() {
        assert!(IssType::SelfIss.is_fatal());
        assert!(IssType::CatastrophicIss.is_fatal());
        assert!(!IssType::OtherIss.is_fatal());
        assert!(!IssType::LackOfData.is_fatal());
    }

    #[test]
    fn test_notification_serializes_type_in_screaming_case() {
        let notification = IssNotification::new(7, IssType::CatastrophicIss);
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["iss_type"], "CATASTROPHIC_ISS");
        assert_eq!(json["round"], 7);
        assert!(json["proof_node_id"].is_null());
    }

    #[test]
    fn test_status_request() {
        let request = StatusTransitionRequest::catastrophic_failure(3, IssType::SelfIss);
        assert_eq!(request.status, NodeStatus::CatastrophicFailure);
        assert_eq!(request.round, 3);
        assert_eq!(request.reason, IssType::SelfIss);
    }
}
