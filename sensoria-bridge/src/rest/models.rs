use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::timestamp::parse_bridge_timestamp;

/// Result of the bridge's connection verification endpoint.
///
/// `connected` reports whether the bridge currently has an acquisition client attached.
/// `client_address` is the `host:port` of that client, when available.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VerifyConnection {
    connected: bool,
    #[serde(default)]
    client_address: Option<String>,
    #[serde(default)]
    total_signals: Option<u64>,
}

impl VerifyConnection {
    /// Whether the bridge reports an active acquisition client.
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Address of the acquisition client, if reported.
    pub fn client_address(&self) -> Option<&str> {
        self.client_address.as_deref()
    }

    /// Total number of signals the bridge has received since it started, if reported.
    pub fn total_signals(&self) -> Option<u64> {
        self.total_signals
    }
}

/// Service information returned by the bridge's root endpoint.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    message: String,
    #[serde(default)]
    tcp_port: Option<u16>,
    status: String,
}

impl ServiceInfo {
    pub fn message(&self) -> &str {
        &self.message
    }

    /// TCP port on which the bridge accepts acquisition clients.
    pub fn tcp_port(&self) -> Option<u16> {
        self.tcp_port
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

/// Acquisition status reported by the bridge.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BridgeStatus {
    connected: bool,
    #[serde(default)]
    last_signal: Option<String>,
    #[serde(default)]
    last_timestamp: Option<String>,
    total_signals: u64,
}

impl BridgeStatus {
    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn last_signal(&self) -> Option<&str> {
        self.last_signal.as_deref()
    }

    pub fn last_timestamp(&self) -> Option<&str> {
        self.last_timestamp.as_deref()
    }

    pub fn total_signals(&self) -> u64 {
        self.total_signals
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connected = if self.connected {
            "connected"
        } else {
            "not connected"
        };

        write!(f, "{connected}, {} signals", self.total_signals)?;

        if let Some(signal) = &self.last_signal {
            write!(f, ", last: {signal}")?;
        }

        Ok(())
    }
}

/// A classified signal as recorded by the bridge.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignalRecord {
    signal: String,
    timestamp: String,
    #[serde(default)]
    raw_data: Option<String>,
}

impl SignalRecord {
    /// Classification label, e.g. `izquierda` / `derecha`.
    pub fn signal(&self) -> &str {
        &self.signal
    }

    /// Timestamp as sent by the bridge.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Parsed timestamp. See [`parse_bridge_timestamp`].
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_bridge_timestamp(&self.timestamp)
    }

    /// Undecoded payload received by the bridge, if recorded.
    pub fn raw_data(&self) -> Option<&str> {
        self.raw_data.as_deref()
    }
}

/// Most recent signals recorded by the bridge.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignalHistory {
    count: usize,
    signals: Vec<SignalRecord>,
}

impl SignalHistory {
    /// Number of signals currently retained by the bridge (not the length of `signals`).
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn signals(&self) -> &[SignalRecord] {
        &self.signals
    }
}
