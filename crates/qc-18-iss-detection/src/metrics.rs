//! # ISS Detection Metrics
//!
//! Prometheus metrics for monitoring state-hash agreement.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-18-iss-detection = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `iss_rounds_decided_total` - Counter of decided rounds (by status)
//! - `iss_reports_dropped_total` - Counter of dropped peer reports (by reason)
//! - `iss_other_node_total` - Counter of peers found disagreeing with consensus
//! - `iss_log_lines_suppressed_total` - Counter of rate-limited log lines (by class)
//! - `iss_tracked_rounds` - Gauge of rounds held in the window
//! - `iss_handler_halted` - Gauge set to 1 once the handler halts the node

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_gauge, register_int_counter, register_int_counter_vec, Gauge, IntCounter,
    IntCounterVec,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Rounds decided, labeled by status
    pub static ref ROUNDS_DECIDED: IntCounterVec = register_int_counter_vec!(
        "iss_rounds_decided_total",
        "Total number of rounds decided",
        &["status"]
    )
    .expect("Failed to create ROUNDS_DECIDED metric");

    /// Peer reports dropped, labeled by reason
    pub static ref REPORTS_DROPPED: IntCounterVec = register_int_counter_vec!(
        "iss_reports_dropped_total",
        "Total number of peer hash reports dropped",
        &["reason"]
    )
    .expect("Failed to create REPORTS_DROPPED metric");

    /// Peers disagreeing with a decided consensus hash
    pub static ref OTHER_NODE_ISS: IntCounter = register_int_counter!(
        "iss_other_node_total",
        "Total number of peers found disagreeing with consensus"
    )
    .expect("Failed to create OTHER_NODE_ISS metric");

    /// Log lines suppressed by the rate limiters, labeled by class
    pub static ref LOG_LINES_SUPPRESSED: IntCounterVec = register_int_counter_vec!(
        "iss_log_lines_suppressed_total",
        "Total number of ISS log lines suppressed by rate limiting",
        &["class"]
    )
    .expect("Failed to create LOG_LINES_SUPPRESSED metric");

    /// Rounds currently held in the window
    pub static ref TRACKED_ROUNDS: Gauge = register_gauge!(
        "iss_tracked_rounds",
        "Number of rounds currently tracked"
    )
    .expect("Failed to create TRACKED_ROUNDS metric");

    /// Whether the handler has halted the node (0=no, 1=yes)
    pub static ref HANDLER_HALTED: Gauge = register_gauge!(
        "iss_handler_halted",
        "Whether the ISS handler halted the node (0=no, 1=yes)"
    )
    .expect("Failed to create HANDLER_HALTED metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a round decision
#[cfg(feature = "metrics")]
pub fn record_round_decided(status: &str) {
    ROUNDS_DECIDED.with_label_values(&[status]).inc();
}

/// Record a dropped peer report
#[cfg(feature = "metrics")]
pub fn record_report_dropped(reason: &str) {
    REPORTS_DROPPED.with_label_values(&[reason]).inc();
}

/// Record a peer disagreeing with consensus
#[cfg(feature = "metrics")]
pub fn record_other_node_iss() {
    OTHER_NODE_ISS.inc();
}

/// Record a suppressed log line
#[cfg(feature = "metrics")]
pub fn record_log_suppressed(class: &str) {
    LOG_LINES_SUPPRESSED.with_label_values(&[class]).inc();
}

/// Update tracked rounds gauge
#[cfg(feature = "metrics")]
pub fn set_tracked_rounds(rounds: usize) {
    TRACKED_ROUNDS.set(rounds as f64);
}

/// Update handler halted flag
#[cfg(feature = "metrics")]
pub fn set_handler_halted(halted: bool) {
    HANDLER_HALTED.set(if halted { 1.0 } else { 0.0 });
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_round_decided(_status: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_report_dropped(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_other_node_iss() {}

#[cfg(not(feature = "metrics"))]
pub fn record_log_suppressed(_class: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn set_tracked_rounds(_rounds: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn set_handler_halted(_halted: bool) {}
