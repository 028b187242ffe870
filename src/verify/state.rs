use std::fmt;

/// Verification state of a single channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    /// States a channel passes through, in order, when a verification begins from `self`.
    ///
    /// A `Connected` channel first drops to `Disconnected`, so that `Connecting` is only ever
    /// entered from `Disconnected` or `Error`. A channel already `Connecting` does not move.
    pub(crate) fn verification_path(self) -> &'static [ConnectionState] {
        match self {
            ConnectionState::Connected => {
                &[ConnectionState::Disconnected, ConnectionState::Connecting]
            }
            ConnectionState::Connecting => &[],
            ConnectionState::Disconnected | ConnectionState::Error => {
                &[ConnectionState::Connecting]
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Error)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Error => write!(f, "Error"),
        }
    }
}
