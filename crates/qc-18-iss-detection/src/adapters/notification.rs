//! Notification sink adapters

use crate::events::IssNotification;
use crate::ports::outbound::IssNotificationSink;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

/// Forwards notifications into a tokio channel.
///
/// The channel is unbounded so `notify` never blocks the detector.
pub struct ChannelNotificationSink {
    sender: mpsc::UnboundedSender<IssNotification>,
}

impl ChannelNotificationSink {
    pub fn new(sender: mpsc::UnboundedSender<IssNotification>) -> Self {
        Self { sender }
    }

    /// Create a sink together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<IssNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl IssNotificationSink for ChannelNotificationSink {
    fn notify(&self, notification: IssNotification) {
        if let Err(e) = self.sender.send(notification) {
            warn!(
                round = e.0.round,
                iss_type = %e.0.iss_type,
                "[qc-18] ISS notification dropped, receiver closed"
            );
        }
    }
}

/// In-memory sink for testing.
#[derive(Default)]
pub struct CollectingNotificationSink {
    notifications: Mutex<Vec<IssNotification>>,
}

impl CollectingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn notifications(&self) -> Vec<IssNotification> {
        self.notifications.lock().clone()
    }

    /// Remove and return everything received so far.
    pub fn take(&self) -> Vec<IssNotification> {
        std::mem::take(&mut *self.notifications.lock())
    }

    pub fn len(&self) -> usize {
        self.notifications.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.lock().is_empty()
    }
}

impl IssNotificationSink for CollectingNotificationSink {
    fn notify(&self, notification: IssNotification) {
        self.notifications.lock().push(notification);
    }
}
