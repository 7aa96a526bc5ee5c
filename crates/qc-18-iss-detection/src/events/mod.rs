//! Events module for ISS detection

pub mod incoming;
pub mod outgoing;

pub use incoming::StateSignaturePayload;
pub use outgoing::{IssNotification, IssType, NodeStatus, StatusTransitionRequest};
