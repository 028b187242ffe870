use std::fmt;

use chrono::{DateTime, Utc};

use sensoria_bridge::models::parse_bridge_timestamp;

/// Motor-imagery class of a signal label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorImagery {
    Left,
    Right,
    Other,
}

impl MotorImagery {
    /// Classifies a bridge label. Matching is case-insensitive and accepts the English and
    /// Spanish labels as well as the single-letter markers sent by the acquisition client.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "left" | "izquierda" | "i" => MotorImagery::Left,
            "right" | "derecha" | "d" => MotorImagery::Right,
            _ => MotorImagery::Other,
        }
    }
}

impl fmt::Display for MotorImagery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorImagery::Left => write!(f, "Left"),
            MotorImagery::Right => write!(f, "Right"),
            MotorImagery::Other => write!(f, "Other"),
        }
    }
}

/// The most recent classified signal of a session.
///
/// `label` and `timestamp` always come from the same frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalReading {
    label: String,
    timestamp: String,
    received_at: DateTime<Utc>,
}

impl SignalReading {
    pub(crate) fn new(label: String, timestamp: String) -> Self {
        Self {
            label,
            timestamp,
            received_at: Utc::now(),
        }
    }

    /// Classification label, as sent by the bridge.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Timestamp, as sent by the bridge.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Parsed bridge timestamp, if it is in a recognized format.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        parse_bridge_timestamp(&self.timestamp)
    }

    /// Local time at which the frame was received.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn motor_imagery(&self) -> MotorImagery {
        MotorImagery::from_label(&self.label)
    }
}

impl fmt::Display for SignalReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.label, self.timestamp)
    }
}
