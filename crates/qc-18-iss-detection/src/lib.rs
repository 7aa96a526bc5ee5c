//! # qc-18-iss-detection
//!
//! State-hash agreement and Invalid State Signature (ISS) detection.
//!
//! ## Overview
//!
//! After every consensus round each node hashes its resulting state and
//! gossips a signature over that hash. This subsystem provides:
//! - **Weighted agreement**: peer hashes grouped by value and weighted by
//!   the round's address book
//! - **Quorum classification**: strictly more than 2/3 of total weight by
//!   default (configurable)
//! - **Bounded memory**: a sliding window of rounds; rounds that fall out
//!   undecided resolve to `LACK_OF_DATA`
//! - **Rate-limited diagnostics**: deterministic partition reports
//!
//! ## Architecture
//!
//! ```text
//! Consensus ──round_completed──→ ┌──────────────────────┐
//! Hashing ──self_hash_computed─→ │ HashAgreementManager │ ──IssNotification──→ IssHandler
//! Gossip ─handle_peer_signature→ └──────────────────────┘                          │
//!                                           │                                       └── StatusTransitionRequest
//!                                      RoundWindow
//!                                           │
//!                               RoundHashValidator (per round)
//!                                           │
//!                                    PartitionFinder
//! ```
//!
//! ## Decision Outcomes
//!
//! | Status | Meaning | Handler action |
//! |--------|---------|----------------|
//! | `VALID` | Self hash matches the quorum hash | none |
//! | `SELF_ISS` | Quorum hash differs from ours | halt |
//! | `CATASTROPHIC_ISS` | No hash can reach quorum | halt |
//! | `CATASTROPHIC_LACK_OF_DATA` | As above, self hash unknown | halt |
//! | `LACK_OF_DATA` | Evicted before a decision | log |
//!
//! ## Example
//!
//! ```rust,ignore
//! use qc_18_iss_detection::{HashAgreementManager, IssDetectionConfig, IssDetectorApi};
//!
//! let manager = HashAgreementManager::new(
//!     IssDetectionConfig::default(),
//!     address_book,
//!     identity,
//!     Arc::new(SystemTimeSource),
//!     sink,
//!     record_store,
//! )?;
//!
//! manager.round_completed(round)?;
//! manager.self_hash_computed(round, hash)?;
//! let (disposition, notifications) =
//!     manager.handle_peer_signature(node_id, round, peer_hash, version, epoch)?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod handler;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::{IssConfigFile, IssDetectionConfig, IssHandlerConfig};
pub use domain::{
    AddressBook, EpochHash, HashValidityStatus, NodeId, QuorumThreshold, ReportDisposition, Round,
    RoundHashValidator, RoundWindow, SoftwareVersion, StateHash, Weight,
};
pub use error::{IssError, IssResult};
pub use events::{
    IssNotification, IssType, NodeStatus, StateSignaturePayload, StatusTransitionRequest,
};
pub use handler::{IssAction, IssHandler};
pub use ports::inbound::IssDetectorApi;
pub use ports::outbound::{IssNotificationSink, IssRecordStore, StatusTransitionGateway, TimeSource};
pub use service::{HashAgreementManager, NodeIdentity};
