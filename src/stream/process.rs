use std::sync::Arc;

use tokio::{
    sync::mpsc,
    time::{self, Instant},
};
use uuid::Uuid;

use sensoria_bridge::models::{ABNORMAL_CLOSURE, NORMAL_CLOSURE, PING_TEXT};

use crate::util::AbortOnDropHandle;

use super::{
    config::StreamSupervisorConfig,
    error::{Result, StreamError},
    machine::{StreamEffect, StreamEvent, StreamMachine},
    transport::{StreamConnector, StreamTransport, TransportEvent},
};

#[derive(Debug)]
pub(crate) enum StreamNoticeKind {
    Effect(StreamEffect),
    /// Reconnection attempts were exhausted; the stream task has stopped.
    Terminated,
}

/// A message from a stream task to the session coordinator, tagged with the session it belongs
/// to.
#[derive(Debug)]
pub(crate) struct StreamNotice {
    pub session_id: Uuid,
    pub kind: StreamNoticeKind,
}

enum ConnectionEnd {
    Shutdown,
    Lost { was_ready: bool },
}

enum Next {
    Shutdown,
    Event(Result<TransportEvent>),
    Heartbeat,
}

pub(super) struct StreamProcess {
    config: StreamSupervisorConfig,
    connector: Arc<dyn StreamConnector>,
    session_id: Uuid,
    notice_tx: mpsc::UnboundedSender<StreamNotice>,
    machine: StreamMachine,
}

impl StreamProcess {
    pub fn spawn(
        config: StreamSupervisorConfig,
        connector: Arc<dyn StreamConnector>,
        session_id: Uuid,
        notice_tx: mpsc::UnboundedSender<StreamNotice>,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> AbortOnDropHandle<()> {
        tokio::spawn(async move {
            let process = Self {
                config,
                connector,
                session_id,
                notice_tx,
                machine: StreamMachine::new(),
            };

            process.recovery_loop(shutdown_rx).await
        })
        .into()
    }

    fn send_notice(&self, kind: StreamNoticeKind) {
        // The coordinator may already be gone
        let _ = self.notice_tx.send(StreamNotice {
            session_id: self.session_id,
            kind,
        });
    }

    fn emit(&mut self, event: StreamEvent) {
        for effect in self.machine.handle(event) {
            self.send_notice(StreamNoticeKind::Effect(effect));
        }
    }

    async fn recovery_loop(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        let mut attempt = 0;

        self.emit(StreamEvent::OpenRequested);

        loop {
            match self.run_connection(&mut shutdown_rx).await {
                ConnectionEnd::Shutdown => {
                    self.emit(StreamEvent::Closed {
                        code: Some(NORMAL_CLOSURE),
                    });
                    return;
                }
                ConnectionEnd::Lost { was_ready } => {
                    if was_ready {
                        attempt = 0;
                    }
                }
            }

            attempt += 1;

            let Some(delay) = self.config.reconnect_policy().delay_for(attempt) else {
                tracing::warn!(session_id = %self.session_id, "reconnection attempts exhausted");
                self.send_notice(StreamNoticeKind::Terminated);
                return;
            };

            self.emit(StreamEvent::Reconnecting { attempt, delay });

            // Handle shutdown signals while waiting for the backoff delay

            tokio::select! {
                _ = time::sleep(delay) => {} // Loop reconnects
                _ = shutdown_rx.recv() => {
                    self.emit(StreamEvent::Closed { code: Some(NORMAL_CLOSURE) });
                    return;
                }
            }
        }
    }

    async fn run_connection(&mut self, shutdown_rx: &mut mpsc::Receiver<()>) -> ConnectionEnd {
        let connect_res = tokio::select! {
            res = self.connector.connect() => res,
            _ = shutdown_rx.recv() => return ConnectionEnd::Shutdown,
        };

        let mut transport = match connect_res {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!(error = %e, "signal stream connection failed");
                self.emit(StreamEvent::ConnectFailed(e.to_string()));
                return ConnectionEnd::Lost { was_ready: false };
            }
        };

        self.emit(StreamEvent::Ready);

        let heartbeat_interval = self.config.heartbeat_interval();
        let heartbeat_timer = time::sleep(heartbeat_interval);
        tokio::pin!(heartbeat_timer);
        let mut awaiting_pong = false;

        loop {
            let next = tokio::select! {
                _ = shutdown_rx.recv() => Next::Shutdown,
                event_res = transport.next_event() => Next::Event(event_res),
                _ = &mut heartbeat_timer => Next::Heartbeat,
            };

            let res = match next {
                Next::Shutdown => {
                    self.close_transport(transport.as_mut()).await;
                    return ConnectionEnd::Shutdown;
                }
                Next::Event(Ok(event)) => {
                    heartbeat_timer
                        .as_mut()
                        .reset(Instant::now() + heartbeat_interval);
                    awaiting_pong = false;

                    match event {
                        TransportEvent::Text(text) => {
                            self.emit(StreamEvent::Frame(text));
                            Ok(())
                        }
                        TransportEvent::Ping(payload) => transport.send_pong(payload).await,
                        TransportEvent::Pong => Ok(()),
                        TransportEvent::Malformed(reason) => {
                            tracing::warn!(%reason, "dropping malformed signal stream frame");
                            Ok(())
                        }
                        TransportEvent::Closed { code } => {
                            let code = code.unwrap_or(ABNORMAL_CLOSURE);
                            self.emit(StreamEvent::Closed { code: Some(code) });
                            return ConnectionEnd::Lost { was_ready: true };
                        }
                    }
                }
                Next::Event(Err(e)) => Err(e),
                Next::Heartbeat => {
                    if awaiting_pong {
                        Err(StreamError::HeartbeatTimeout(heartbeat_interval))
                    } else {
                        heartbeat_timer
                            .as_mut()
                            .reset(Instant::now() + heartbeat_interval);
                        awaiting_pong = true;

                        tracing::debug!("sending heartbeat ping");
                        transport.send_text(PING_TEXT).await
                    }
                }
            };

            if let Err(e) = res {
                tracing::warn!(error = %e, "signal stream error");
                self.emit(StreamEvent::Error(e.to_string()));
                return ConnectionEnd::Lost { was_ready: true };
            }
        }
    }

    async fn close_transport(&self, transport: &mut dyn StreamTransport) {
        if let Err(e) = transport.close(NORMAL_CLOSURE).await {
            tracing::debug!(error = %e, "failed to send close frame");
            return;
        }

        let timeout = self.config.close_confirmation_timeout();

        let confirmation = time::timeout(timeout, async {
            loop {
                match transport.next_event().await {
                    Ok(TransportEvent::Closed { .. }) | Err(_) => return,
                    Ok(_) => {} // Frames after close are discarded
                }
            }
        })
        .await;

        if confirmation.is_err() {
            let e = StreamError::NoCloseConfirmation(timeout);
            tracing::warn!(error = %e, "closing signal stream");
        }
    }
}
