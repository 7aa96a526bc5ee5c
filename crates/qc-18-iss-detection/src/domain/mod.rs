//! Domain module for ISS detection
//!
//! ## Core Modules
//! - address_book: Node identities, weights and software versions
//! - hash: State hashes
//! - threshold: Weighted quorum arithmetic
//! - partition: Grouping of reports by hash
//! - round_validator: Per-round decision state machine
//! - round_window: Sliding window of validators
//!
//! ## Support
//! - rate_limiter: Time gate for repeated log lines
//! - report: Report outcomes and drop reasons
//! - status: Validity status of a round

pub mod address_book;
pub mod hash;
pub mod partition;
pub mod rate_limiter;
pub mod report;
pub mod round_validator;
pub mod round_window;
pub mod status;
pub mod threshold;

/// Consensus round number
pub type Round = u64;

/// Consensus weight of a node
pub type Weight = u64;

// Core exports
pub use address_book::{AddressBook, NodeId, SoftwareVersion};
pub use hash::{EpochHash, StateHash, STATE_HASH_LEN};
pub use partition::{Partition, PartitionFinder};
pub use round_validator::RoundHashValidator;
pub use round_window::{EvictedRound, RoundWindow, RoutedReport};
pub use status::HashValidityStatus;
pub use threshold::QuorumThreshold;

// Support exports
pub use rate_limiter::RateLimiter;
pub use report::{HashReport, ReportDisposition, ReportOutcome};
