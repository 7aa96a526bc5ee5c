//! Error types for the ISS detection subsystem
//!
//! Everything here is an internal contract violation or an infrastructure
//! failure. Expected outcomes (late, early, foreign or duplicate reports)
//! are not errors; see [`crate::domain::ReportDisposition`].

use crate::domain::Round;
use thiserror::Error;

/// ISS detection subsystem errors
#[derive(Debug, Error)]
pub enum IssError {
    /// Round completion did not follow the previous round
    #[error("Unexpected round number: expected {expected}, got {actual}")]
    RoundOutOfOrder { expected: Round, actual: Round },

    /// A self hash arrived for a round that has no validator
    #[error("Round {round} is not being tracked")]
    RoundNotTracked { round: Round },

    /// Classification requested for a round that has not decided
    #[error("Round {round} reached classification while still undecided")]
    UndecidedClassification { round: Round },

    /// Sliding window contract violation
    #[error("Round window violation: {reason}")]
    RoundWindow { reason: String },

    /// Address book carries no voting weight
    #[error("Address book has zero total weight")]
    EmptyAddressBook,

    /// Invalid configuration value
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Configuration file could not be read or parsed
    #[error("Failed to load configuration from {path}: {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Durable ISS record failure
    #[error("Storage error: {reason}")]
    Storage { reason: String },
}

/// Result type for ISS detection operations
pub type IssResult<T> = Result<T, IssError>;
