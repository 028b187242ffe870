use async_trait::async_trait;

use sensoria_bridge::{
    SignalStreamConnection, StreamTarget, WebSocketClientConfig, models::StreamRead,
};

use super::error::{Result, StreamError};

/// A message received over an open signal stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    Ping(Vec<u8>),
    Pong,
    /// An undecodable frame. The stream remains open.
    Malformed(String),
    /// The peer closed the stream, or the connection dropped (`code: None`).
    Closed { code: Option<u16> },
}

/// An open signal stream.
#[async_trait]
pub trait StreamTransport: Send {
    async fn next_event(&mut self) -> Result<TransportEvent>;

    async fn send_text(&mut self, text: &str) -> Result<()>;

    async fn send_pong(&mut self, payload: Vec<u8>) -> Result<()>;

    /// Sends a close frame with `code`. The peer's confirmation arrives as
    /// [`TransportEvent::Closed`].
    ///
    /// Must not be called after [`TransportEvent::Closed`] was received, the peer's close has
    /// already been answered.
    async fn close(&mut self, code: u16) -> Result<()>;
}

/// Opens signal streams.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// Checks that a stream could be opened at all, without performing I/O.
    fn validate(&self) -> Result<()>;

    async fn connect(&self) -> Result<Box<dyn StreamTransport>>;
}

#[async_trait]
impl StreamTransport for SignalStreamConnection {
    async fn next_event(&mut self) -> Result<TransportEvent> {
        let event = match self.read().await.map_err(StreamError::Transport)? {
            StreamRead::Text(text) => TransportEvent::Text(text),
            StreamRead::Ping(payload) => TransportEvent::Ping(payload),
            StreamRead::Pong => TransportEvent::Pong,
            StreamRead::Malformed(reason) => TransportEvent::Malformed(reason),
            StreamRead::Close { code } => TransportEvent::Closed { code },
        };

        Ok(event)
    }

    async fn send_text(&mut self, text: &str) -> Result<()> {
        SignalStreamConnection::send_text(self, text)
            .await
            .map_err(StreamError::Transport)
    }

    async fn send_pong(&mut self, payload: Vec<u8>) -> Result<()> {
        SignalStreamConnection::send_pong(self, payload)
            .await
            .map_err(StreamError::Transport)
    }

    async fn close(&mut self, code: u16) -> Result<()> {
        self.send_close(code).await.map_err(StreamError::Transport)
    }
}

/// Connects to the bridge's WebSocket signal stream.
pub struct BridgeStreamConnector {
    config: WebSocketClientConfig,
}

impl BridgeStreamConnector {
    pub fn new(config: impl Into<WebSocketClientConfig>) -> Self {
        Self {
            config: config.into(),
        }
    }
}

#[async_trait]
impl StreamConnector for BridgeStreamConnector {
    fn validate(&self) -> Result<()> {
        StreamTarget::parse(self.config.stream_url()).map_err(StreamError::InvalidTarget)?;
        Ok(())
    }

    async fn connect(&self) -> Result<Box<dyn StreamTransport>> {
        let connection = SignalStreamConnection::connect(&self.config)
            .await
            .map_err(StreamError::Connect)?;

        Ok(Box::new(connection))
    }
}
