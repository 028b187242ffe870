use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::mpsc,
};

use super::{
    error::{Result, StreamError},
    transport::{StreamConnector, StreamTransport, TransportEvent},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Text(String),
    Pong(Vec<u8>),
    Close(u16),
}

/// Test-side handle of a [`FakeTransport`].
pub(crate) struct FakeStream {
    events_tx: mpsc::UnboundedSender<Result<TransportEvent>>,
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl FakeStream {
    pub fn push(&self, event: TransportEvent) {
        let _ = self.events_tx.send(Ok(event));
    }

    pub fn push_text(&self, text: &str) {
        self.push(TransportEvent::Text(text.to_string()));
    }

    pub fn push_error(&self, reason: &str) {
        let _ = self
            .events_tx
            .send(Err(StreamError::Generic(reason.to_string())));
    }

    /// Returns `true` once the transport side has been dropped.
    pub fn is_dropped(&self) -> bool {
        self.events_tx.is_closed()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn close_codes(&self) -> Vec<u16> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Close(code) => Some(code),
                _ => None,
            })
            .collect()
    }
}

pub(crate) struct FakeTransport {
    events_rx: mpsc::UnboundedReceiver<Result<TransportEvent>>,
    sent: Arc<Mutex<Vec<Sent>>>,
    echo_close: bool,
    pending_close: Option<u16>,
}

#[async_trait]
impl StreamTransport for FakeTransport {
    async fn next_event(&mut self) -> Result<TransportEvent> {
        if let Some(code) = self.pending_close.take() {
            return Ok(TransportEvent::Closed { code: Some(code) });
        }

        match self.events_rx.recv().await {
            Some(event) => event,
            None => Ok(TransportEvent::Closed { code: None }),
        }
    }

    async fn send_text(&mut self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
        Ok(())
    }

    async fn send_pong(&mut self, payload: Vec<u8>) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Pong(payload));
        Ok(())
    }

    async fn close(&mut self, code: u16) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Close(code));
        if self.echo_close {
            self.pending_close = Some(code);
        }
        Ok(())
    }
}

/// In-memory [`StreamConnector`]. Every accepted connection is handed to the test as a
/// [`FakeStream`].
pub(crate) struct FakeConnector {
    invalid_target: bool,
    refusals: Mutex<usize>,
    refuse_all: bool,
    echo_close: bool,
    connects: AtomicUsize,
    streams_tx: mpsc::UnboundedSender<FakeStream>,
}

impl FakeConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FakeStream>) {
        let (streams_tx, streams_rx) = mpsc::unbounded_channel();

        let connector = Self {
            invalid_target: false,
            refusals: Mutex::new(0),
            refuse_all: false,
            echo_close: true,
            connects: AtomicUsize::new(0),
            streams_tx,
        };

        (connector, streams_rx)
    }

    pub fn with_invalid_target(mut self) -> Self {
        self.invalid_target = true;
        self
    }

    /// Refuses the next `count` connection attempts.
    pub fn with_refusals(self, count: usize) -> Self {
        *self.refusals.lock().unwrap() += count;
        self
    }

    pub fn refusing_all(mut self) -> Self {
        self.refuse_all = true;
        self
    }

    /// Close frames are not confirmed by the fake peer.
    pub fn without_close_echo(mut self) -> Self {
        self.echo_close = false;
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamConnector for FakeConnector {
    fn validate(&self) -> Result<()> {
        if self.invalid_target {
            return Err(StreamError::Generic("unsupported scheme `http`".to_string()));
        }
        Ok(())
    }

    async fn connect(&self) -> Result<Box<dyn StreamTransport>> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let refused = {
            let mut refusals = self.refusals.lock().unwrap();
            let refused = self.refuse_all || *refusals > 0;
            *refusals = refusals.saturating_sub(1);
            refused
        };

        if refused {
            return Err(StreamError::Generic("connection refused".to_string()));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));

        let _ = self.streams_tx.send(FakeStream {
            events_tx,
            sent: sent.clone(),
        });

        Ok(Box::new(FakeTransport {
            events_rx,
            sent,
            echo_close: self.echo_close,
            pending_close: None,
        }))
    }
}

/// Unmasked server frame with a payload shorter than 126 bytes.
pub(crate) fn server_frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x80 | opcode, payload.len() as u8];
    frame.extend_from_slice(payload);
    frame
}

/// Accepts a single WebSocket client on loopback and sends it the raw `frames`. The connection
/// is kept open until the client goes away. Returns the stream URL.
pub(crate) async fn serve_signal_stream(frames: Vec<Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let stream_url = format!("ws://{}/ws/signals", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = "HTTP/1.1 101 Switching Protocols\r\nupgrade: websocket\r\nconnection: Upgrade\r\nsec-websocket-accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";
        socket.write_all(response.as_bytes()).await.unwrap();
        for frame in frames {
            socket.write_all(&frame).await.unwrap();
        }

        while let Ok(n) = socket.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
    });

    stream_url
}
