use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};

use crate::{util::DateTimeExt, verify::ChannelId};

/// Severity of a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A user-visible message produced by the session coordinator.
///
/// Notifications are delivered to observers as [`SessionUpdate::Notification`] and mirrored to
/// `tracing` at a level matching their [`Severity`]. Rendering them is up to the presentation
/// layer.
///
/// [`SessionUpdate::Notification`]: crate::session::SessionUpdate::Notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    title: String,
    description: String,
    severity: Severity,
    time: DateTime<Utc>,
}

impl Notification {
    fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            time: Utc::now(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Time at which the notification was created.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub(crate) fn log(&self) {
        match self.severity {
            Severity::Info | Severity::Success => {
                tracing::info!(title = %self.title, "{}", self.description)
            }
            Severity::Warning => tracing::warn!(title = %self.title, "{}", self.description),
            Severity::Error => tracing::error!(title = %self.title, "{}", self.description),
        }
    }

    pub(crate) fn verification_connected(channel: &ChannelId, peer: Option<&str>) -> Self {
        let description = match peer {
            Some(peer) => format!("Channel `{channel}` is connected to {peer}"),
            None => format!("Channel `{channel}` is connected"),
        };

        Self::new(Severity::Success, "Connected", description)
    }

    pub(crate) fn verification_no_peer(channel: &ChannelId) -> Self {
        Self::new(
            Severity::Warning,
            "Not connected",
            format!(
                "The bridge is reachable through `{channel}` but reports no active acquisition client"
            ),
        )
    }

    pub(crate) fn verification_failed(channel: &ChannelId, reason: &str) -> Self {
        Self::new(
            Severity::Error,
            "Connection error",
            format!("Could not reach the bridge through `{channel}`: {reason}"),
        )
    }

    pub(crate) fn cannot_start(failures: &[(ChannelId, String)]) -> Self {
        let reasons = failures
            .iter()
            .map(|(channel, reason)| format!("`{channel}`: {reason}"))
            .collect::<Vec<_>>()
            .join("; ");

        Self::new(
            Severity::Error,
            "Cannot start session",
            format!("Session not started, {reasons}"),
        )
    }

    pub(crate) fn session_started(peers: &[String]) -> Self {
        let description = if peers.is_empty() {
            "Session started".to_string()
        } else {
            format!("Session started, receiving from {}", peers.join(", "))
        };

        Self::new(Severity::Success, "Session started", description)
    }

    pub(crate) fn session_stopped(reason: &str) -> Self {
        Self::new(
            Severity::Info,
            "Session stopped",
            format!("Session stopped: {reason}"),
        )
    }

    pub(crate) fn stream_lost() -> Self {
        Self::new(
            Severity::Error,
            "Session stopped",
            "Session stopped: signal stream lost",
        )
    }

    pub(crate) fn stream_ready() -> Self {
        Self::new(
            Severity::Success,
            "Signal stream connected",
            "Receiving signals from the bridge",
        )
    }

    pub(crate) fn stream_unavailable(reason: &str) -> Self {
        Self::new(
            Severity::Error,
            "Signal stream unavailable",
            format!("Could not open the signal stream: {reason}"),
        )
    }

    pub(crate) fn stream_error(reason: &str) -> Self {
        Self::new(
            Severity::Error,
            "Signal stream error",
            format!("Signal stream error: {reason}"),
        )
    }

    pub(crate) fn unexpected_disconnect(code: Option<u16>) -> Self {
        let description = match code {
            Some(code) => format!("Signal stream closed unexpectedly (code {code})"),
            None => "Signal stream closed unexpectedly".to_string(),
        };

        Self::new(Severity::Warning, "Signal stream disconnected", description)
    }

    pub(crate) fn stream_reconnecting(attempt: u32, delay: Duration) -> Self {
        Self::new(
            Severity::Info,
            "Reconnecting",
            format!(
                "Reconnecting to the signal stream in {} ms (attempt {attempt})",
                delay.as_millis()
            ),
        )
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.time.format_local_time_millis(),
            self.severity,
            self.title,
            self.description
        )
    }
}
