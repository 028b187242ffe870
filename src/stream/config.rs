use std::time::Duration;

use crate::session::SessionConfig;

/// Backoff policy applied when an active session's signal stream is lost.
///
/// The delay before reconnection attempt `n` (starting at 1) is
/// `min(initial_delay * factor^(n - 1), max_delay)`. After `max_attempts` consecutive failed
/// attempts the stream is given up and the session is stopped. The attempt counter resets each
/// time the stream becomes ready again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    initial_delay: Duration,
    factor: u32,
    max_delay: Duration,
    max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            factor: 2,
            max_delay: Duration::from_secs(8),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never reconnects. A lost stream stops the session right away.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sets the delay before the first reconnection attempt.
    ///
    /// Default: `500` milliseconds
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the multiplier applied to the delay after each failed attempt.
    ///
    /// Default: `2`
    pub fn with_factor(mut self, factor: u32) -> Self {
        self.factor = factor;
        self
    }

    /// Sets the upper bound of the delay between attempts.
    ///
    /// Default: `8` seconds
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the number of consecutive attempts before giving up. `0` disables reconnection.
    ///
    /// Default: `5`
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Delay before reconnection `attempt` (1-based), or `None` once attempts are exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }

        let multiplier = self.factor.checked_pow(attempt - 1).unwrap_or(u32::MAX);
        let delay = self
            .initial_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay);

        Some(delay.min(self.max_delay))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StreamSupervisorConfig {
    close_timeout: Duration,
    close_confirmation_timeout: Duration,
    heartbeat_interval: Duration,
    reconnect_policy: ReconnectPolicy,
}

impl StreamSupervisorConfig {
    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }

    pub fn close_confirmation_timeout(&self) -> Duration {
        self.close_confirmation_timeout
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn reconnect_policy(&self) -> &ReconnectPolicy {
        &self.reconnect_policy
    }
}

impl From<&SessionConfig> for StreamSupervisorConfig {
    fn from(value: &SessionConfig) -> Self {
        Self {
            close_timeout: value.stream_close_timeout(),
            close_confirmation_timeout: value.close_confirmation_timeout(),
            heartbeat_interval: value.heartbeat_interval(),
            reconnect_policy: value.reconnect_policy().clone(),
        }
    }
}
