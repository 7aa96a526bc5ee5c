//! ISS handler
//!
//! Maps ISS notifications to platform actions. Fatal notifications always
//! request a catastrophic-failure status; other-node ISS only does so when
//! configured. Once the node is halted every further notification is ignored.
//! State dumps are throttled to one per `seconds_between_state_dumps`.

use crate::config::IssHandlerConfig;
use crate::domain::RateLimiter;
use crate::events::{IssNotification, IssType, StatusTransitionRequest};
use crate::metrics;
use crate::ports::outbound::{IssNotificationSink, StatusTransitionGateway, TimeSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Reason attached to state dumps requested by the handler
pub const STATE_DUMP_REASON: &str = "iss";

/// What the handler did with a notification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssAction {
    /// A catastrophic-failure status transition was requested
    Halted,
    /// Logged (and possibly dumped) without a status change
    Logged,
    /// The node was already halted
    Ignored,
}

pub struct IssHandler<G: StatusTransitionGateway> {
    config: IssHandlerConfig,
    gateway: Arc<G>,
    dump_limiter: RateLimiter,
    halted: AtomicBool,
}

impl<G: StatusTransitionGateway> IssHandler<G> {
    pub fn new(config: IssHandlerConfig, gateway: Arc<G>, time: Arc<dyn TimeSource>) -> Self {
        Self {
            dump_limiter: RateLimiter::from_secs(time, config.seconds_between_state_dumps),
            config,
            gateway,
            halted: AtomicBool::new(false),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// React to one notification.
    pub fn handle(&self, notification: &IssNotification) -> IssAction {
        if self.is_halted() {
            return IssAction::Ignored;
        }

        match notification.iss_type {
            IssType::SelfIss | IssType::CatastrophicIss => {
                self.maybe_dump(notification);
                self.halt(notification)
            }
            IssType::OtherIss => {
                self.maybe_dump(notification);
                if self.config.halt_on_any_iss {
                    return self.halt(notification);
                }
                warn!(
                    round = notification.round,
                    node = ?notification.proof_node_id,
                    "[qc-18] Other node ISS observed, continuing"
                );
                IssAction::Logged
            }
            IssType::LackOfData => {
                info!(
                    round = notification.round,
                    "[qc-18] Lack of data for round, no action"
                );
                IssAction::Logged
            }
        }
    }

    fn maybe_dump(&self, notification: &IssNotification) {
        if !self.config.dump_state_on_any_iss {
            return;
        }
        match self.dump_limiter.request_and_trigger() {
            Some(_) => self.gateway.request_state_dump(STATE_DUMP_REASON, false),
            None => debug!(
                round = notification.round,
                iss_type = %notification.iss_type,
                "[qc-18] State dump throttled"
            ),
        }
    }

    fn halt(&self, notification: &IssNotification) -> IssAction {
        // Only the first caller requests the transition
        if self.halted.swap(true, Ordering::SeqCst) {
            return IssAction::Ignored;
        }

        error!(
            round = notification.round,
            iss_type = %notification.iss_type,
            "[qc-18] Requesting catastrophic failure status"
        );
        self.gateway
            .request_status_transition(StatusTransitionRequest::catastrophic_failure(
                notification.round,
                notification.iss_type,
            ));
        metrics::set_handler_halted(true);
        IssAction::Halted
    }

    /// Drain notifications from a channel until every sender is gone.
    pub async fn run(self: Arc<Self>, mut receiver: mpsc::UnboundedReceiver<IssNotification>) {
        while let Some(notification) = receiver.recv().await {
            self.handle(&notification);
        }
        info!("[qc-18] ISS notification channel closed, handler stopping");
    }
}

impl<G: StatusTransitionGateway> IssNotificationSink for IssHandler<G> {
    fn notify(&self, notification: IssNotification) {
        self.handle(&notification);
    }
}
