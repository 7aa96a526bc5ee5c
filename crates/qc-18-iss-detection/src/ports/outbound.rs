//! Driven Ports (SPI - Outbound Dependencies)
//!
//! Every port here is synchronous. Detection runs on the caller's thread
//! and must never await while holding round state.

use crate::domain::Round;
use crate::error::IssResult;
use crate::events::{IssNotification, StatusTransitionRequest};

/// Wall clock used by the log rate limiters.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now_millis(&self) -> u64;
}

/// Receives ISS notifications as soon as a round is classified.
///
/// Implementations must not block; the detector calls this while a
/// report or round boundary is being processed.
pub trait IssNotificationSink: Send + Sync {
    fn notify(&self, notification: IssNotification);
}

/// Platform status control used by the ISS handler
pub trait StatusTransitionGateway: Send + Sync {
    /// Ask the platform to enter a new status (e.g. catastrophic failure).
    fn request_status_transition(&self, request: StatusTransitionRequest);

    /// Ask the platform to write a state dump labelled with `reason`.
    fn request_state_dump(&self, reason: &str, blocking: bool);
}

/// Durable record of the most recent round that raised a fatal ISS.
///
/// Survives restarts so a replayed round does not fire the same ISS twice.
pub trait IssRecordStore: Send + Sync {
    fn load_last_iss_round(&self) -> IssResult<Option<Round>>;

    fn save_last_iss_round(&self, round: Round) -> IssResult<()>;
}
