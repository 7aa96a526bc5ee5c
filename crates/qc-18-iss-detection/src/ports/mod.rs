//! Ports module for ISS detection

pub mod inbound;
pub mod outbound;

pub use inbound::IssDetectorApi;
pub use outbound::{IssNotificationSink, IssRecordStore, StatusTransitionGateway, TimeSource};
