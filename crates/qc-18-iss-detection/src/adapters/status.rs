//! Status transition adapters

use crate::events::StatusTransitionRequest;
use crate::ports::outbound::StatusTransitionGateway;
use parking_lot::RwLock;
use tracing::{error, info};

/// Gateway that only logs; for nodes without a status controller.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingStatusGateway;

impl StatusTransitionGateway for LoggingStatusGateway {
    fn request_status_transition(&self, request: StatusTransitionRequest) {
        error!(
            round = request.round,
            reason = %request.reason,
            status = ?request.status,
            "[qc-18] Status transition requested"
        );
    }

    fn request_state_dump(&self, reason: &str, blocking: bool) {
        info!(reason, blocking, "[qc-18] State dump requested");
    }
}

/// A state dump request captured by [`RecordingStatusGateway`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpRequest {
    pub reason: String,
    pub blocking: bool,
}

/// In-memory gateway for testing.
#[derive(Default)]
pub struct RecordingStatusGateway {
    transitions: RwLock<Vec<StatusTransitionRequest>>,
    dumps: RwLock<Vec<DumpRequest>>,
}

impl RecordingStatusGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<StatusTransitionRequest> {
        self.transitions.read().clone()
    }

    pub fn dumps(&self) -> Vec<DumpRequest> {
        self.dumps.read().clone()
    }
}

impl StatusTransitionGateway for RecordingStatusGateway {
    fn request_status_transition(&self, request: StatusTransitionRequest) {
        self.transitions.write().push(request);
    }

    fn request_state_dump(&self, reason: &str, blocking: bool) {
        self.dumps.write().push(DumpRequest {
            reason: reason.to_string(),
            blocking,
        });
    }
}
