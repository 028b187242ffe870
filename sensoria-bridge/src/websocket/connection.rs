use std::{future::Future, sync::Arc};

use fastwebsockets::{FragmentCollector, Frame, OpCode, WebSocketError, handshake};
use http_body_util::Empty;
use hyper::{
    Request,
    body::Bytes,
    header::{CONNECTION, UPGRADE},
    upgrade::Upgraded,
};
use hyper_util::rt::TokioIo;
use reqwest::Url;
use tokio::{net::TcpStream, time};
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
};
use webpki_roots::TLS_SERVER_ROOTS;

use super::{
    super::config::WebSocketClientConfig,
    error::{ConnectionResult, WebSocketConnectionError},
};

/// A message read from the signal stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamRead {
    Text(String),
    /// Close frame or dropped connection. `code` is `None` when the peer sent no status code.
    Close {
        code: Option<u16>,
    },
    Ping(Vec<u8>),
    Pong,
    /// A frame that could not be decoded, e.g. a text frame with invalid UTF-8 or a binary
    /// frame. The frame has been consumed and the connection remains usable.
    Malformed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamScheme {
    Plain,
    Tls,
}

/// Validated address of a signal stream.
///
/// Parsing is synchronous, so a target that can never be opened is rejected before any I/O.
#[derive(Clone, Debug)]
pub struct StreamTarget {
    scheme: StreamScheme,
    host: String,
    port: u16,
    uri: String,
}

impl StreamTarget {
    /// Parses and validates a `ws://` or `wss://` URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use sensoria_bridge::StreamTarget;
    ///
    /// assert!(StreamTarget::parse("ws://localhost:8000/ws/signals").is_ok());
    /// assert!(StreamTarget::parse("http://localhost:8000/ws/signals").is_err());
    /// ```
    pub fn parse(stream_url: &str) -> ConnectionResult<Self> {
        let url = Url::parse(stream_url)
            .map_err(|e| WebSocketConnectionError::InvalidUrl(e.to_string()))?;

        let scheme = match url.scheme() {
            "ws" => StreamScheme::Plain,
            "wss" => StreamScheme::Tls,
            other => return Err(WebSocketConnectionError::UnsupportedScheme(other.to_string())),
        };

        let host = url
            .host_str()
            .ok_or_else(|| WebSocketConnectionError::InvalidUrl(format!("no host in {url}")))?
            .to_string();

        let port = url
            .port_or_known_default()
            .ok_or_else(|| WebSocketConnectionError::InvalidUrl(format!("no port in {url}")))?;

        Ok(Self {
            scheme,
            host,
            port,
            uri: url.to_string(),
        })
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls(&self) -> bool {
        self.scheme == StreamScheme::Tls
    }
}

struct SpawnExecutor;

impl<Fut> hyper::rt::Executor<Fut> for SpawnExecutor
where
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    fn execute(&self, fut: Fut) {
        tokio::task::spawn(fut);
    }
}

/// An open WebSocket connection to the bridge's signal stream.
pub struct SignalStreamConnection(FragmentCollector<TokioIo<Upgraded>>);

impl SignalStreamConnection {
    /// Opens the signal stream described by `config`.
    ///
    /// The TCP connection, optional TLS negotiation and WebSocket handshake are bounded by the
    /// configured handshake timeout.
    pub async fn connect(config: &WebSocketClientConfig) -> ConnectionResult<Self> {
        let target = StreamTarget::parse(config.stream_url())?;

        time::timeout(config.handshake_timeout(), Self::connect_target(&target))
            .await
            .map_err(|_| WebSocketConnectionError::HandshakeTimeout(config.handshake_timeout()))?
    }

    async fn connect_target(target: &StreamTarget) -> ConnectionResult<Self> {
        let addr = target.addr();

        let req = Request::builder()
            .method("GET")
            .uri(&target.uri)
            .header("Host", &addr)
            .header(UPGRADE, "websocket")
            .header(CONNECTION, "upgrade")
            .header("Sec-WebSocket-Key", handshake::generate_key())
            .header("Sec-WebSocket-Version", "13")
            .body(Empty::<Bytes>::new())
            .map_err(WebSocketConnectionError::HttpUpgradeRequest)?;

        let tcp_stream = TcpStream::connect(&addr)
            .await
            .map_err(WebSocketConnectionError::CreateTcpStream)?;

        let (ws, _) = match target.scheme {
            StreamScheme::Plain => handshake::client(&SpawnExecutor, req, tcp_stream).await,
            StreamScheme::Tls => {
                let server_name = ServerName::try_from(target.host.clone())
                    .map_err(WebSocketConnectionError::InvalidDnsName)?;

                let tls_connector = {
                    let mut root_cert_store = RootCertStore::empty();
                    root_cert_store.extend(TLS_SERVER_ROOTS.iter().cloned());

                    let config = ClientConfig::builder()
                        .with_root_certificates(root_cert_store)
                        .with_no_client_auth();

                    TlsConnector::from(Arc::new(config))
                };

                let tls_stream = tls_connector
                    .connect(server_name, tcp_stream)
                    .await
                    .map_err(WebSocketConnectionError::ConnectTlsStream)?;

                handshake::client(&SpawnExecutor, req, tls_stream).await
            }
        }
        .map_err(WebSocketConnectionError::Handshake)?;

        tracing::debug!(uri = %target.uri, "signal stream handshake completed");

        Ok(Self(FragmentCollector::new(ws)))
    }

    async fn send_frame(&mut self, frame: Frame<'_>) -> ConnectionResult<()> {
        self.0
            .write_frame(frame)
            .await
            .map_err(WebSocketConnectionError::WriteFrame)
    }

    pub async fn send_text(&mut self, text: &str) -> ConnectionResult<()> {
        let frame = Frame::text(text.as_bytes().to_vec().into());
        self.send_frame(frame).await
    }

    pub async fn send_close(&mut self, code: u16) -> ConnectionResult<()> {
        let frame = Frame::close(code, &[]);
        self.send_frame(frame).await
    }

    pub async fn send_pong(&mut self, payload: Vec<u8>) -> ConnectionResult<()> {
        let frame = Frame::pong(payload.into());
        self.send_frame(frame).await
    }

    /// Reads the next message.
    ///
    /// Pings are answered and the peer's close frame is echoed by the underlying socket.
    pub async fn read(&mut self) -> ConnectionResult<StreamRead> {
        let frame = match self.0.read_frame().await {
            Ok(frame) => frame,
            // Connection may be dropped before (or instead of) a close frame
            Err(WebSocketError::ConnectionClosed | WebSocketError::UnexpectedEOF) => {
                return Ok(StreamRead::Close { code: None });
            }
            Err(WebSocketError::InvalidUTF8) => {
                return Ok(StreamRead::Malformed("invalid UTF-8 in text frame".to_string()));
            }
            Err(e) => return Err(WebSocketConnectionError::ReadFrame(e)),
        };

        let res = match frame.opcode {
            OpCode::Text => match String::from_utf8(frame.payload.to_vec()) {
                Ok(text) => StreamRead::Text(text),
                Err(e) => StreamRead::Malformed(format!("invalid UTF-8 in text frame, {e}")),
            },
            OpCode::Binary => {
                StreamRead::Malformed(format!("binary frame of {} bytes", frame.payload.len()))
            }
            OpCode::Close => StreamRead::Close {
                code: close_code(&frame.payload),
            },
            OpCode::Ping => StreamRead::Ping(frame.payload.to_vec()),
            OpCode::Pong => StreamRead::Pong,
            unhandled_opcode => {
                return Err(WebSocketConnectionError::UnhandledOpCode(unhandled_opcode));
            }
        };

        Ok(res)
    }
}

fn close_code(payload: &[u8]) -> Option<u16> {
    match payload {
        [high, low, ..] => Some(u16::from_be_bytes([*high, *low])),
        _ => None,
    }
}
