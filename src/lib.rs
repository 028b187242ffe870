#![doc = include_str!("../README.md")]

mod notification;
/// Exports [`SessionCoordinator`] and other types related to session state.
///
/// [`SessionCoordinator`]: crate::session::SessionCoordinator
pub mod session;
/// Exports [`StreamMachine`], the [`StreamConnector`] seam and other types related to the signal
/// stream.
///
/// [`StreamMachine`]: crate::stream::StreamMachine
/// [`StreamConnector`]: crate::stream::StreamConnector
pub mod stream;
/// Exports [`SessionTui`] and other types related to the Terminal User Interface (TUI).
///
/// [`SessionTui`]: crate::tui::SessionTui
pub mod tui;
mod util;
/// Exports the [`ChannelVerifier`] seam, its bridge implementations and other types related to
/// channel verification.
///
/// [`ChannelVerifier`]: crate::verify::ChannelVerifier
pub mod verify;

pub use notification::{Notification, Severity};

/// Error types returned by `sensoria`.
pub mod error {
    pub use super::session::error::SessionError;
    pub use super::stream::error::StreamError;
    pub use super::tui::error::TuiError;
    pub use super::verify::error::VerificationError;

    // Re-export `sensoria-bridge` errors for convenience
    pub use sensoria_bridge::error::{RestApiError, WebSocketConnectionError};

    /// Convenience general-purpose Result type alias.
    pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
}

/// Exports bridge configuration and selected `sensoria-bridge` models.
pub mod models {
    pub use sensoria_bridge::{
        BridgeConfig,
        models::{
            BridgeFrame, BridgeStatus, NORMAL_CLOSURE, SignalHistory, SignalRecord,
            VerifyConnection, parse_bridge_timestamp,
        },
    };
}
