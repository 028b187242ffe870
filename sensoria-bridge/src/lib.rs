//! Client SDK for the Sensoria signal bridge.
//!
//! The bridge mediates between an EEG acquisition client and a neurofeedback front-end. It
//! exposes a small REST API, used mainly to verify that an acquisition client is attached, and a
//! WebSocket endpoint that pushes classified motor-imagery signals in real time.
//!
//! - [`RestClient`] wraps the REST API.
//! - [`SignalStreamConnection`] is a single WebSocket connection to the signal stream.
//!
//! Both are configured from a [`BridgeConfig`].

mod config;
mod rest;
mod timestamp;
mod websocket;

pub use config::{BridgeConfig, RestClientConfig, WebSocketClientConfig};
pub use rest::RestClient;
pub use websocket::{SignalStreamConnection, StreamTarget};

pub mod error {
    pub use super::rest::error::{RestApiError, Result as RestResult};
    pub use super::websocket::error::{ConnectionResult, WebSocketConnectionError};
}

pub mod models {
    pub use super::rest::models::{
        BridgeStatus, ServiceInfo, SignalHistory, SignalRecord, VerifyConnection,
    };
    pub use super::timestamp::parse_bridge_timestamp;
    pub use super::websocket::StreamRead;
    pub use super::websocket::models::{ABNORMAL_CLOSURE, BridgeFrame, NORMAL_CLOSURE, PING_TEXT};
}
