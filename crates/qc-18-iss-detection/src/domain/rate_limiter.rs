//! # Rate Limiter
//!
//! Wall-clock gate for log lines that would otherwise flood the output when
//! the same failure repeats every round.
//!
//! Unlike a token bucket, the gate allows at most one trigger per interval
//! and counts the requests it denied in between, so the next emitted line
//! can report how many were skipped.

use crate::ports::outbound::TimeSource;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct GateState {
    /// Timestamp (ms) of the last allowed request, `None` before the first
    last_trigger_ms: Option<u64>,
    /// Requests denied since the last trigger
    denied: u64,
}

/// Time gate allowing one event per `interval`.
pub struct RateLimiter {
    interval_ms: u64,
    time: Arc<dyn TimeSource>,
    state: Mutex<GateState>,
}

impl RateLimiter {
    /// Create a limiter allowing one trigger per `interval`.
    pub fn new(time: Arc<dyn TimeSource>, interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            time,
            state: Mutex::new(GateState {
                last_trigger_ms: None,
                denied: 0,
            }),
        }
    }

    /// Create a limiter from a whole number of seconds.
    pub fn from_secs(time: Arc<dyn TimeSource>, seconds: u64) -> Self {
        Self::new(time, Duration::from_secs(seconds))
    }

    /// Request permission to trigger.
    ///
    /// Returns `Some(skipped)` if allowed, where `skipped` is the number of
    /// requests denied since the previous trigger. Returns `None` if the
    /// interval has not elapsed yet; the denial is counted.
    pub fn request_and_trigger(&self) -> Option<u64> {
        let now = self.time.now_millis();
        let mut state = self.state.lock();

        let allowed = match state.last_trigger_ms {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval_ms,
        };

        if allowed {
            state.last_trigger_ms = Some(now);
            Some(std::mem::take(&mut state.denied))
        } else {
            state.denied += 1;
            None
        }
    }

    /// Requests denied since the last trigger.
    pub fn denied_requests(&self) -> u64 {
        self.state.lock().denied
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
