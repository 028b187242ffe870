use std::str::FromStr;

use serde::Deserialize;

/// WebSocket close code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when a connection ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Text frame the bridge answers with a [`BridgeFrame::Pong`].
pub const PING_TEXT: &str = "ping";

/// A JSON frame pushed by the bridge over the signal stream.
///
/// Frames are discriminated by their `type` field. Kinds this client does not know about
/// deserialize to [`BridgeFrame::Other`] instead of failing.
///
/// # Examples
///
/// ```
/// use sensoria_bridge::models::BridgeFrame;
///
/// let frame: BridgeFrame =
///     r#"{"type": "signal", "signal": "left", "timestamp": "2025-01-01T00:00:00Z"}"#
///         .parse()
///         .unwrap();
///
/// assert!(matches!(frame, BridgeFrame::Signal { .. }));
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BridgeFrame {
    /// A classified motor-imagery signal.
    Signal { signal: String, timestamp: String },
    /// Sent once by the bridge right after the stream is accepted.
    Connection {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
    /// Sent by the bridge after a period without client messages.
    Keepalive,
    /// Answer to a [`PING_TEXT`] message.
    Pong,
    #[serde(other)]
    Other,
}

impl BridgeFrame {
    /// Name of the frame kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeFrame::Signal { .. } => "signal",
            BridgeFrame::Connection { .. } => "connection",
            BridgeFrame::Keepalive => "keepalive",
            BridgeFrame::Pong => "pong",
            BridgeFrame::Other => "other",
        }
    }

    /// Returns `true` for a `connection` frame whose status is `connected`.
    pub fn is_connection_confirmed(&self) -> bool {
        matches!(self, BridgeFrame::Connection { status: Some(status), .. } if status == "connected")
    }
}

impl FromStr for BridgeFrame {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signal_frame() {
        let frame: BridgeFrame =
            r#"{"signal": "izquierda", "timestamp": "2025-01-01T00:00:00.5", "type": "signal"}"#
                .parse()
                .unwrap();

        assert_eq!(
            frame,
            BridgeFrame::Signal {
                signal: "izquierda".to_string(),
                timestamp: "2025-01-01T00:00:00.5".to_string(),
            }
        );
    }

    #[test]
    fn parses_connection_frame() {
        let frame: BridgeFrame = r#"{"type": "connection", "message": "Connected to signal stream", "status": "connected"}"#
            .parse()
            .unwrap();

        assert_eq!(frame.kind(), "connection");
        assert!(frame.is_connection_confirmed());
    }

    #[test]
    fn connection_frame_without_status_is_not_confirmed() {
        let frame: BridgeFrame = r#"{"type": "connection"}"#.parse().unwrap();

        assert!(!frame.is_connection_confirmed());
    }

    #[test]
    fn parses_keepalive_and_pong() {
        assert_eq!(
            r#"{"type": "keepalive"}"#.parse::<BridgeFrame>().unwrap(),
            BridgeFrame::Keepalive
        );
        assert_eq!(
            r#"{"type": "pong"}"#.parse::<BridgeFrame>().unwrap(),
            BridgeFrame::Pong
        );
    }

    #[test]
    fn unknown_kind_is_other() {
        let frame: BridgeFrame = r#"{"type": "calibration", "progress": 0.4}"#.parse().unwrap();

        assert_eq!(frame, BridgeFrame::Other);
    }

    #[test]
    fn malformed_frames_fail() {
        assert!("not json".parse::<BridgeFrame>().is_err());
        assert!(r#"{"signal": "left"}"#.parse::<BridgeFrame>().is_err());
        assert!(r#"{"type": "signal", "signal": "left"}"#.parse::<BridgeFrame>().is_err());
    }
}
