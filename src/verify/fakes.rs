use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Notify, time};

use crate::stream::error::StreamError;

use super::{
    core::{ChannelVerifier, PeerStatus},
    error::{Result, VerificationError},
};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Connected(Option<&'static str>),
    NoPeer,
    Unreachable,
}

impl Reply {
    fn into_result(self) -> Result<PeerStatus> {
        match self {
            Reply::Connected(peer) => Ok(PeerStatus::Connected {
                peer: peer.map(str::to_string),
            }),
            Reply::NoPeer => Ok(PeerStatus::NoPeer),
            Reply::Unreachable => Err(VerificationError::StreamProbe(StreamError::Generic(
                "connection refused".to_string(),
            ))),
        }
    }
}

/// Scripted [`ChannelVerifier`]. Replies are consumed in order; the last one repeats.
pub(crate) struct FakeVerifier {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl FakeVerifier {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(Reply::Unreachable),
            delay: None,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(reply: Reply) -> Self {
        Self::new([reply])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Each check waits for a permit from `gate`.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelVerifier for FakeVerifier {
    async fn check(&self) -> Result<PeerStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(reply) = replies.pop_front() {
                *last = reply;
            }
            last.clone()
        };

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if let Some(delay) = self.delay {
            time::sleep(delay).await;
        }

        reply.into_result()
    }
}

/// Serves a single canned HTTP response on a local port and returns the bridge's base URL.
pub(crate) async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let api_url = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });

    api_url
}
