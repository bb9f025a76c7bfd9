//! Reconnect scheduling policy

use std::time::Duration;

/// Exponential backoff with a hard cap on attempts.
///
/// Delay for reconnect attempt `n` (1-based) is `base * growth^(n-1)`,
/// computed in f64 seconds so fractional milliseconds are kept exactly
/// (attempt 5 with the defaults is 15187.5ms). Once `max_attempts`
/// consecutive failures have been recorded no further attempt is scheduled;
/// resuming requires an explicit `connect()`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub growth: f64,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { base: Duration::from_millis(3000), growth: 1.5, max_attempts: 5 }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let secs = self.base.as_secs_f64() * self.growth.powi(exponent as i32);
        Duration::from_secs_f64(secs)
    }

    /// Whether reconnect attempt `attempt` (1-based) is still within the cap
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}
