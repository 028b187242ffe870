use std::time::Duration;

use crate::stream::ReconnectPolicy;

/// Configuration for the [`SessionCoordinator`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sensoria::{session::SessionConfig, stream::ReconnectPolicy};
///
/// let config = SessionConfig::default()
///     .with_verify_timeout(Duration::from_secs(3))
///     .with_reconnect_policy(ReconnectPolicy::disabled());
/// ```
///
/// [`SessionCoordinator`]: super::SessionCoordinator
#[derive(Clone, Debug)]
pub struct SessionConfig {
    verify_timeout: Duration,
    stream_close_timeout: Duration,
    close_confirmation_timeout: Duration,
    heartbeat_interval: Duration,
    reconnect_policy: ReconnectPolicy,
    signal_history_len: usize,
    update_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            verify_timeout: Duration::from_secs(5),
            stream_close_timeout: Duration::from_secs(6),
            close_confirmation_timeout: Duration::from_secs(3),
            heartbeat_interval: Duration::from_secs(15),
            reconnect_policy: ReconnectPolicy::default(),
            signal_history_len: 100,
            update_capacity: 1_000,
        }
    }
}

impl SessionConfig {
    /// Returns the upper bound of a single channel verification.
    pub fn verify_timeout(&self) -> Duration {
        self.verify_timeout
    }

    /// Returns the time the stream task is given to stop before it is aborted.
    pub fn stream_close_timeout(&self) -> Duration {
        self.stream_close_timeout
    }

    /// Returns the time to wait for the bridge to confirm a close frame.
    pub fn close_confirmation_timeout(&self) -> Duration {
        self.close_confirmation_timeout
    }

    /// Returns the stream silence after which a heartbeat `ping` is sent.
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn reconnect_policy(&self) -> &ReconnectPolicy {
        &self.reconnect_policy
    }

    /// Returns the number of signals retained in the session history.
    pub fn signal_history_len(&self) -> usize {
        self.signal_history_len
    }

    /// Returns the capacity of the update broadcast channel.
    pub fn update_capacity(&self) -> usize {
        self.update_capacity
    }

    /// Sets the verification timeout. An expired verification is reported as a transport
    /// failure.
    ///
    /// Default: `5` seconds
    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    /// Sets the stream close timeout.
    ///
    /// Default: `6` seconds
    pub fn with_stream_close_timeout(mut self, timeout: Duration) -> Self {
        self.stream_close_timeout = timeout;
        self
    }

    /// Sets the close confirmation timeout. Must be shorter than the stream close timeout.
    ///
    /// Default: `3` seconds
    pub fn with_close_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.close_confirmation_timeout = timeout;
        self
    }

    /// Sets the heartbeat interval.
    ///
    /// Default: `15` seconds
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the policy applied when the signal stream of an active session is lost.
    ///
    /// Default: [`ReconnectPolicy::default`]
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect_policy = policy;
        self
    }

    /// Sets the number of signals retained in the session history.
    ///
    /// Default: `100`
    pub fn with_signal_history_len(mut self, len: usize) -> Self {
        self.signal_history_len = len;
        self
    }

    /// Sets the capacity of the update broadcast channel.
    ///
    /// Default: `1000`
    pub fn with_update_capacity(mut self, capacity: usize) -> Self {
        self.update_capacity = capacity;
        self
    }
}
