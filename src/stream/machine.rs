use std::{fmt, time::Duration};

use sensoria_bridge::models::{BridgeFrame, NORMAL_CLOSURE};

use crate::notification::Notification;

use super::models::SignalReading;

/// Lifecycle phase of the signal stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StreamPhase {
    #[default]
    Closed,
    Opening,
    Open,
    /// Closed after an error or an abnormal closure.
    Failed(String),
}

impl StreamPhase {
    pub fn is_open(&self) -> bool {
        matches!(self, StreamPhase::Open)
    }

    fn is_live(&self) -> bool {
        matches!(self, StreamPhase::Opening | StreamPhase::Open)
    }
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamPhase::Closed => write!(f, "Closed"),
            StreamPhase::Opening => write!(f, "Opening"),
            StreamPhase::Open => write!(f, "Open"),
            StreamPhase::Failed(reason) => write!(f, "Failed ({reason})"),
        }
    }
}

/// Input of the [`StreamMachine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    OpenRequested,
    /// The stream target was rejected before any I/O.
    ConstructionFailed(String),
    ConnectFailed(String),
    Ready,
    Frame(String),
    Error(String),
    Closed { code: Option<u16> },
    Reconnecting { attempt: u32, delay: Duration },
}

/// Output of the [`StreamMachine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEffect {
    Notify(Notification),
    Signal(SignalReading),
    PhaseChanged { phase: StreamPhase, connected: bool },
}

/// Pure transition function of the signal stream.
///
/// The machine performs no I/O. Each [`StreamEvent`] fed through [`handle`](Self::handle) yields
/// the effects the owner must apply, in order.
#[derive(Debug, Default)]
pub struct StreamMachine {
    phase: StreamPhase,
    connected: bool,
}

impl StreamMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &StreamPhase {
        &self.phase
    }

    /// Whether the stream is currently delivering frames.
    pub fn connected(&self) -> bool {
        self.connected
    }

    fn transition(&mut self, phase: StreamPhase, connected: bool) -> StreamEffect {
        tracing::debug!(from = %self.phase, to = %phase, connected, "stream phase");

        self.phase = phase.clone();
        self.connected = connected;

        StreamEffect::PhaseChanged { phase, connected }
    }

    pub fn handle(&mut self, event: StreamEvent) -> Vec<StreamEffect> {
        match event {
            StreamEvent::OpenRequested => {
                if self.phase.is_live() {
                    return Vec::new();
                }
                vec![self.transition(StreamPhase::Opening, false)]
            }
            StreamEvent::ConstructionFailed(reason) => {
                if self.phase.is_live() {
                    return Vec::new();
                }
                let notification = Notification::stream_unavailable(&reason);
                vec![
                    self.transition(StreamPhase::Failed(reason), false),
                    StreamEffect::Notify(notification),
                ]
            }
            StreamEvent::ConnectFailed(reason) => {
                if self.phase != StreamPhase::Opening {
                    return Vec::new();
                }
                let notification = Notification::stream_error(&reason);
                vec![
                    self.transition(StreamPhase::Failed(reason), false),
                    StreamEffect::Notify(notification),
                ]
            }
            StreamEvent::Ready => {
                if self.phase != StreamPhase::Opening {
                    return Vec::new();
                }
                vec![
                    self.transition(StreamPhase::Open, true),
                    StreamEffect::Notify(Notification::stream_ready()),
                ]
            }
            StreamEvent::Frame(text) => {
                if !self.phase.is_open() {
                    tracing::debug!("frame dropped, stream not open");
                    return Vec::new();
                }
                Self::handle_frame(&text).into_iter().collect()
            }
            StreamEvent::Error(reason) => {
                if !self.phase.is_live() {
                    return Vec::new();
                }
                let notification = Notification::stream_error(&reason);
                vec![
                    self.transition(StreamPhase::Failed(reason), false),
                    StreamEffect::Notify(notification),
                ]
            }
            StreamEvent::Closed { code } => match self.phase {
                StreamPhase::Closed => Vec::new(),
                StreamPhase::Failed(_) => vec![self.transition(StreamPhase::Closed, false)],
                StreamPhase::Opening | StreamPhase::Open => {
                    if code == Some(NORMAL_CLOSURE) {
                        return vec![self.transition(StreamPhase::Closed, false)];
                    }

                    let reason = match code {
                        Some(code) => format!("closed with code {code}"),
                        None => "closed without status code".to_string(),
                    };
                    vec![
                        self.transition(StreamPhase::Failed(reason), false),
                        StreamEffect::Notify(Notification::unexpected_disconnect(code)),
                    ]
                }
            },
            StreamEvent::Reconnecting { attempt, delay } => {
                if self.phase.is_live() {
                    return Vec::new();
                }
                vec![
                    self.transition(StreamPhase::Opening, false),
                    StreamEffect::Notify(Notification::stream_reconnecting(attempt, delay)),
                ]
            }
        }
    }

    fn handle_frame(text: &str) -> Option<StreamEffect> {
        let frame = match text.parse::<BridgeFrame>() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, frame = text, "malformed frame dropped");
                return None;
            }
        };

        match frame {
            BridgeFrame::Signal { signal, timestamp } => {
                tracing::debug!(%signal, %timestamp, "signal received");
                Some(StreamEffect::Signal(SignalReading::new(signal, timestamp)))
            }
            BridgeFrame::Connection { message, status } => {
                tracing::debug!(?message, ?status, "connection frame");
                None
            }
            BridgeFrame::Keepalive | BridgeFrame::Pong => {
                tracing::trace!(kind = frame.kind(), "liveness frame");
                None
            }
            BridgeFrame::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_machine() -> StreamMachine {
        let mut machine = StreamMachine::new();
        machine.handle(StreamEvent::OpenRequested);
        machine.handle(StreamEvent::Ready);
        machine
    }

    fn notifications(effects: &[StreamEffect]) -> Vec<&Notification> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                StreamEffect::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn open_then_ready() {
        let mut machine = StreamMachine::new();

        let effects = machine.handle(StreamEvent::OpenRequested);
        assert_eq!(
            effects,
            vec![StreamEffect::PhaseChanged {
                phase: StreamPhase::Opening,
                connected: false
            }]
        );

        let effects = machine.handle(StreamEvent::Ready);
        assert_eq!(machine.phase(), &StreamPhase::Open);
        assert!(machine.connected());
        assert_eq!(notifications(&effects)[0].title(), "Signal stream connected");
    }

    #[test]
    fn construction_failure_never_reaches_opening() {
        let mut machine = StreamMachine::new();

        let effects = machine.handle(StreamEvent::ConstructionFailed("bad url".to_string()));

        assert_eq!(machine.phase(), &StreamPhase::Failed("bad url".to_string()));
        assert!(!effects.iter().any(|effect| matches!(
            effect,
            StreamEffect::PhaseChanged {
                phase: StreamPhase::Opening,
                ..
            }
        )));
        assert_eq!(notifications(&effects).len(), 1);
    }

    #[test]
    fn signal_frame_while_open() {
        let mut machine = open_machine();

        let effects = machine.handle(StreamEvent::Frame(
            r#"{"type":"signal","signal":"left","timestamp":"2025-01-01T00:00:00Z"}"#.to_string(),
        ));

        match effects.as_slice() {
            [StreamEffect::Signal(reading)] => {
                assert_eq!(reading.label(), "left");
                assert_eq!(reading.timestamp(), "2025-01-01T00:00:00Z");
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn signal_frame_ignored_unless_open() {
        let frame = r#"{"type":"signal","signal":"left","timestamp":"2025-01-01T00:00:00Z"}"#;

        let mut machine = StreamMachine::new();
        assert!(machine.handle(StreamEvent::Frame(frame.to_string())).is_empty());

        machine.handle(StreamEvent::OpenRequested);
        assert!(machine.handle(StreamEvent::Frame(frame.to_string())).is_empty());
    }

    #[test]
    fn malformed_and_unknown_frames_are_dropped() {
        let mut machine = open_machine();

        assert!(machine.handle(StreamEvent::Frame("{not json".to_string())).is_empty());
        assert!(
            machine
                .handle(StreamEvent::Frame(r#"{"type":"calibration"}"#.to_string()))
                .is_empty()
        );
        assert!(
            machine
                .handle(StreamEvent::Frame(r#"{"type":"keepalive"}"#.to_string()))
                .is_empty()
        );
        assert_eq!(machine.phase(), &StreamPhase::Open);
        assert!(machine.connected());
    }

    #[test]
    fn normal_closure_is_silent() {
        let mut machine = open_machine();

        let effects = machine.handle(StreamEvent::Closed {
            code: Some(NORMAL_CLOSURE),
        });

        assert_eq!(machine.phase(), &StreamPhase::Closed);
        assert!(!machine.connected());
        assert!(notifications(&effects).is_empty());
    }

    #[test]
    fn abnormal_closure_notifies() {
        let mut machine = open_machine();

        let effects = machine.handle(StreamEvent::Closed { code: Some(1006) });

        assert!(matches!(machine.phase(), StreamPhase::Failed(_)));
        assert!(!machine.connected());

        let notifications = notifications(&effects);
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].description().contains("1006"));
    }

    #[test]
    fn error_clears_connected_and_close_after_error_is_silent() {
        let mut machine = open_machine();

        let effects = machine.handle(StreamEvent::Error("reset by peer".to_string()));
        assert!(!machine.connected());
        assert_eq!(notifications(&effects).len(), 1);

        let effects = machine.handle(StreamEvent::Closed { code: Some(1006) });
        assert_eq!(machine.phase(), &StreamPhase::Closed);
        assert!(notifications(&effects).is_empty());

        assert!(machine.handle(StreamEvent::Closed { code: None }).is_empty());
    }

    #[test]
    fn reconnecting_reopens_after_failure() {
        let mut machine = StreamMachine::new();
        machine.handle(StreamEvent::OpenRequested);
        machine.handle(StreamEvent::ConnectFailed("refused".to_string()));

        let effects = machine.handle(StreamEvent::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(500),
        });

        assert_eq!(machine.phase(), &StreamPhase::Opening);
        assert_eq!(notifications(&effects)[0].title(), "Reconnecting");

        // Already opening
        assert!(machine.handle(StreamEvent::OpenRequested).is_empty());
    }
}
