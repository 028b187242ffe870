use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::notification::Notification;

use super::{
    error::{Result, VerificationError},
    state::ConnectionState,
};

/// Identifier of a logical channel whose connectivity gates session start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The default single channel, the bridge itself.
    pub fn bridge() -> Self {
        Self::new("bridge")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What a reachable bridge reports about its acquisition peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerStatus {
    Connected { peer: Option<String> },
    NoPeer,
}

/// A way of checking one channel's connectivity.
///
/// Implementations perform exactly one check per call, without retries. Timeouts are applied by
/// the caller.
#[async_trait]
pub trait ChannelVerifier: Send + Sync {
    async fn check(&self) -> Result<PeerStatus>;
}

/// Settled result of a single verification.
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    Connected { peer: Option<String> },
    NoPeer,
    Failed(Arc<VerificationError>),
}

impl VerificationOutcome {
    pub fn connection_state(&self) -> ConnectionState {
        match self {
            VerificationOutcome::Connected { .. } => ConnectionState::Connected,
            VerificationOutcome::NoPeer | VerificationOutcome::Failed(_) => ConnectionState::Error,
        }
    }

    pub fn peer(&self) -> Option<&str> {
        match self {
            VerificationOutcome::Connected { peer } => peer.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn notification(&self, channel: &ChannelId) -> Notification {
        match self {
            VerificationOutcome::Connected { peer } => {
                Notification::verification_connected(channel, peer.as_deref())
            }
            VerificationOutcome::NoPeer => Notification::verification_no_peer(channel),
            VerificationOutcome::Failed(e) => {
                Notification::verification_failed(channel, &e.to_string())
            }
        }
    }

    /// Short reason for a non-connected outcome, used in combined start failures.
    pub(crate) fn failure_reason(&self) -> Option<String> {
        match self {
            VerificationOutcome::Connected { .. } => None,
            VerificationOutcome::NoPeer => Some("bridge reports no active peer".to_string()),
            VerificationOutcome::Failed(e) => Some(format!("verification failed ({e})")),
        }
    }
}

impl From<Result<PeerStatus>> for VerificationOutcome {
    fn from(value: Result<PeerStatus>) -> Self {
        match value {
            Ok(PeerStatus::Connected { peer }) => VerificationOutcome::Connected { peer },
            Ok(PeerStatus::NoPeer) => VerificationOutcome::NoPeer,
            Err(e) => VerificationOutcome::Failed(Arc::new(e)),
        }
    }
}
