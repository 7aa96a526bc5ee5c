//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound port traits for production and tests.

mod notification;
mod record_store;
mod status;
mod time;

pub use notification::{ChannelNotificationSink, CollectingNotificationSink};
pub use record_store::{FileIssRecordStore, InMemoryIssRecordStore};
pub use status::{DumpRequest, LoggingStatusGateway, RecordingStatusGateway};
pub use time::{ManualTimeSource, SystemTimeSource};
