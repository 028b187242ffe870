use std::{
    collections::HashSet,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::join_all;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use sensoria_bridge::{BridgeConfig, RestClient};

use crate::{
    notification::Notification,
    stream::{
        BridgeStreamConnector, StreamConnector, StreamEffect, StreamEvent, StreamMachine,
        StreamNotice, StreamNoticeKind, StreamSupervisor, error::StreamError,
    },
    util::AbortOnDropHandle,
    verify::{
        ChannelId, ChannelVerifier, ConnectionState, HttpVerifier, VerificationClient,
        VerificationOutcome,
    },
};

use super::{
    config::SessionConfig,
    error::{Result, SessionError},
    state::{
        SessionReader, SessionReceiver, SessionSnapshot, SessionStateManager, SessionStatus,
        SessionUpdate,
    },
};

struct Channel {
    id: ChannelId,
    verifier: Arc<dyn ChannelVerifier>,
    // Held for the duration of a verification of this channel
    in_flight: Mutex<()>,
}

struct CoordinatorInner {
    config: SessionConfig,
    verification: VerificationClient,
    channels: Vec<Channel>,
    supervisor: StreamSupervisor,
    state_manager: Arc<SessionStateManager>,
    // Serializes session start and stop
    transition_lock: Mutex<()>,
    notice_tx: mpsc::UnboundedSender<StreamNotice>,
    shut_down: AtomicBool,
}

impl CoordinatorInner {
    fn ensure_running(&self) -> Result<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(SessionError::ShutDown);
        }
        Ok(())
    }

    fn channel(&self, id: &ChannelId) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|channel| &channel.id == id)
            .ok_or_else(|| SessionError::UnknownChannel(id.clone()))
    }

    /// Verifies `channel`. The caller must hold the channel's `in_flight` lock.
    async fn verify_locked(&self, channel: &Channel, notify: bool) -> VerificationOutcome {
        let current = self
            .state_manager
            .channel_state(&channel.id)
            .unwrap_or_default();

        for &state in current.verification_path() {
            self.state_manager.update(|s| {
                if let Some(snapshot) = s.channel_mut(&channel.id) {
                    snapshot.set_state(state);
                }
            });
        }

        let outcome = self
            .verification
            .run(&channel.id, channel.verifier.as_ref())
            .await;

        self.state_manager.update(|s| {
            if let Some(snapshot) = s.channel_mut(&channel.id) {
                match &outcome {
                    VerificationOutcome::Connected { peer } => snapshot.set_connected(peer.clone()),
                    _ => snapshot.set_state(outcome.connection_state()),
                }
            }
        });

        if notify {
            self.state_manager.notify(outcome.notification(&channel.id));
        }

        outcome
    }

    async fn verify_channel(&self, channel: &Channel) -> ConnectionState {
        let Ok(_in_flight) = channel.in_flight.try_lock() else {
            tracing::debug!(channel = %channel.id, "verification already in flight");
            return ConnectionState::Connecting;
        };

        self.verify_locked(channel, true).await.connection_state()
    }

    fn apply_effects(
        &self,
        snapshot: &mut SessionSnapshot,
        effects: Vec<StreamEffect>,
    ) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();

        for effect in effects {
            match effect {
                StreamEffect::PhaseChanged { phase, connected } => {
                    snapshot.set_stream(phase, connected)
                }
                StreamEffect::Signal(reading) => {
                    snapshot.record_signal(reading.clone(), self.config.signal_history_len());
                    updates.push(SessionUpdate::Signal(reading));
                }
                StreamEffect::Notify(notification) => {
                    updates.push(SessionUpdate::Notification(notification))
                }
            }
        }

        updates
    }

    fn publish(&self, updates: Vec<SessionUpdate>) {
        for update in updates {
            self.state_manager.send(update);
        }
    }

    /// Starts a session. The caller must hold the transition lock.
    async fn start_locked(&self) -> SessionStatus {
        let status = self.state_manager.status();
        if status != SessionStatus::Inactive {
            return status;
        }

        self.state_manager
            .update(|s| s.set_status(SessionStatus::Starting));

        // Fresh verification of every channel, never trusting cached state

        let outcomes = join_all(self.channels.iter().map(|channel| async move {
            let _in_flight = channel.in_flight.lock().await;
            (channel.id.clone(), self.verify_locked(channel, false).await)
        }))
        .await;

        let failures = outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.failure_reason().map(|r| (id.clone(), r)))
            .collect::<Vec<_>>();

        if !failures.is_empty() {
            self.state_manager
                .update(|s| s.set_status(SessionStatus::Inactive));
            self.state_manager
                .notify(Notification::cannot_start(&failures));
            return SessionStatus::Inactive;
        }

        let peers = outcomes
            .iter()
            .filter_map(|(_, outcome)| outcome.peer().map(str::to_string))
            .collect::<Vec<_>>();

        let session_id = Uuid::new_v4();

        // Activation and stream construction happen under the state lock
        let (open_res, updates) = self.state_manager.update_with(|s| {
            match self.supervisor.open(session_id, self.notice_tx.clone()) {
                Ok(()) => {
                    s.activate(session_id);
                    (Ok(()), Vec::new())
                }
                Err(e) => {
                    let effects =
                        StreamMachine::new().handle(StreamEvent::ConstructionFailed(e.to_string()));
                    let updates = self.apply_effects(s, effects);
                    s.set_status(SessionStatus::Inactive);
                    (Err(e), updates)
                }
            }
        });

        self.publish(updates);

        if let Err(e) = open_res {
            tracing::error!(error = %e, "signal stream could not be constructed");
            return SessionStatus::Inactive;
        }

        tracing::info!(%session_id, "session started");
        self.state_manager
            .notify(Notification::session_started(&peers));

        SessionStatus::Active
    }

    /// Stops the active session, if any. The caller must hold the transition lock.
    ///
    /// The session is always left inactive. An error is returned if the stream did not close
    /// cleanly.
    async fn stop_locked(&self, notification: Notification) -> std::result::Result<(), StreamError> {
        let detached = self.state_manager.update_if(|s| {
            if !s.is_active() {
                return None;
            }
            let session_id = s.session_id();
            s.detach();
            Some(session_id)
        });

        let Some(session_id) = detached else {
            return Ok(());
        };

        let close_res = self.supervisor.close().await;
        if let Err(e) = &close_res {
            tracing::warn!(error = %e, "signal stream did not close cleanly");
        }

        self.state_manager.update(|s| s.deactivate());

        if let Some(session_id) = session_id {
            tracing::info!(%session_id, "session stopped");
        }
        self.state_manager.notify(notification);

        close_res
    }

    async fn handle_notice(&self, notice: StreamNotice) {
        let StreamNotice { session_id, kind } = notice;

        match kind {
            StreamNoticeKind::Effect(effect) => {
                let updates = self.state_manager.update_if(|s| {
                    if s.session_id() != Some(session_id) {
                        return None;
                    }
                    Some(self.apply_effects(s, vec![effect]))
                });

                match updates {
                    Some(updates) => self.publish(updates),
                    None => tracing::debug!(%session_id, "stale stream notice dropped"),
                }
            }
            StreamNoticeKind::Terminated => {
                let _transition = self.transition_lock.lock().await;

                if self.state_manager.session_id() != Some(session_id) {
                    return;
                }

                tracing::warn!(%session_id, "signal stream lost");

                if let Err(e) = self.stop_locked(Notification::stream_lost()).await {
                    tracing::warn!(error = %e, "stopping session after stream loss");
                }
            }
        }
    }

    fn spawn_notice_pump(
        inner: Weak<Self>,
        mut notice_rx: mpsc::UnboundedReceiver<StreamNotice>,
    ) -> AbortOnDropHandle<()> {
        tokio::spawn(async move {
            while let Some(notice) = notice_rx.recv().await {
                let Some(inner) = inner.upgrade() else {
                    return;
                };

                inner.handle_notice(notice).await;
            }
        })
        .into()
    }
}

/// Builder for a [`SessionCoordinator`] with custom channels or stream connector.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use sensoria::{
///     models::BridgeConfig,
///     session::{SessionConfig, SessionCoordinatorBuilder},
///     stream::BridgeStreamConnector,
///     verify::StreamProbeVerifier,
/// };
///
/// let bridge = BridgeConfig::default();
/// let connector = Arc::new(BridgeStreamConnector::new(&bridge));
///
/// let coordinator = SessionCoordinatorBuilder::new(SessionConfig::default())
///     .with_channel("stream", Arc::new(StreamProbeVerifier::new(connector.clone())))
///     .with_stream_connector(connector)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SessionCoordinatorBuilder {
    config: SessionConfig,
    channels: Vec<(ChannelId, Arc<dyn ChannelVerifier>)>,
    connector: Option<Arc<dyn StreamConnector>>,
}

impl SessionCoordinatorBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            channels: Vec::new(),
            connector: None,
        }
    }

    /// Adds a channel that must verify as connected before a session can start.
    pub fn with_channel(
        mut self,
        id: impl Into<ChannelId>,
        verifier: Arc<dyn ChannelVerifier>,
    ) -> Self {
        self.channels.push((id.into(), verifier));
        self
    }

    /// Sets the connector used to open the signal stream of active sessions.
    pub fn with_stream_connector(mut self, connector: Arc<dyn StreamConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(SessionError::NoChannels);
        }

        let mut seen = HashSet::new();
        for (id, _) in &self.channels {
            if !seen.insert(id) {
                return Err(SessionError::DuplicateChannel(id.clone()));
            }
        }

        if self.config.heartbeat_interval().is_zero() {
            return Err(SessionError::InvalidConfig(
                "heartbeat interval must be positive".to_string(),
            ));
        }

        if self.config.close_confirmation_timeout() >= self.config.stream_close_timeout() {
            return Err(SessionError::InvalidConfig(
                "close confirmation timeout must be shorter than the stream close timeout"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Builds the coordinator. Must be called within a Tokio runtime.
    pub fn build(self) -> Result<SessionCoordinator> {
        self.validate()?;

        let connector = self.connector.ok_or(SessionError::NoStreamConnector)?;

        let state_manager = SessionStateManager::new(
            SessionSnapshot::new(self.channels.iter().map(|(id, _)| id.clone())),
            self.config.update_capacity(),
        );

        let channels = self
            .channels
            .into_iter()
            .map(|(id, verifier)| Channel {
                id,
                verifier,
                in_flight: Mutex::new(()),
            })
            .collect();

        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(CoordinatorInner {
            verification: VerificationClient::new(self.config.verify_timeout()),
            supervisor: StreamSupervisor::new((&self.config).into(), connector),
            config: self.config,
            channels,
            state_manager,
            transition_lock: Mutex::new(()),
            notice_tx,
            shut_down: AtomicBool::new(false),
        });

        let _pump_handle = CoordinatorInner::spawn_notice_pump(Arc::downgrade(&inner), notice_rx);

        Ok(SessionCoordinator {
            inner,
            _pump_handle,
        })
    }
}

/// Coordinates channel verification, session state, and the signal stream.
///
/// `SessionCoordinator` is the single source of truth for the presentation layer, which reads it
/// through [`snapshot`](Self::snapshot) and [`update_receiver`](Self::update_receiver). A session
/// can only become active after a fresh verification of every configured channel succeeds.
/// While a session is active the coordinator owns exactly one signal stream, which is closed on
/// every path out of the active state, including [`shutdown`](Self::shutdown) and drop.
pub struct SessionCoordinator {
    inner: Arc<CoordinatorInner>,
    _pump_handle: AbortOnDropHandle<()>,
}

impl SessionCoordinator {
    /// Creates a coordinator with a single `bridge` channel, verified through the bridge's REST
    /// API, and the bridge's WebSocket signal stream. Must be called within a Tokio runtime.
    pub fn new(config: SessionConfig, bridge: &BridgeConfig) -> Result<Self> {
        let rest_client = RestClient::new(bridge)?;

        SessionCoordinatorBuilder::new(config)
            .with_channel(
                ChannelId::bridge(),
                Arc::new(HttpVerifier::new(rest_client)),
            )
            .with_stream_connector(Arc::new(BridgeStreamConnector::new(bridge)))
            .build()
    }

    /// Returns the identifiers of the configured channels.
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.inner
            .channels
            .iter()
            .map(|channel| channel.id.clone())
            .collect()
    }

    /// Verifies a single channel.
    ///
    /// The channel is `Connecting` from before the request is issued until it settles as
    /// `Connected` or `Error`. If a verification of the channel is already in flight, no request
    /// is issued and `Connecting` is returned.
    pub async fn verify_channel(&self, id: &ChannelId) -> Result<ConnectionState> {
        self.inner.ensure_running()?;

        let channel = self.inner.channel(id)?;

        Ok(self.inner.verify_channel(channel).await)
    }

    /// Verifies every channel concurrently. See [`verify_channel`](Self::verify_channel).
    pub async fn verify(&self) -> Result<Vec<(ChannelId, ConnectionState)>> {
        self.inner.ensure_running()?;

        let states = join_all(self.inner.channels.iter().map(|channel| async move {
            (channel.id.clone(), self.inner.verify_channel(channel).await)
        }))
        .await;

        Ok(states)
    }

    /// Starts a session if none is active, returning the resulting session status.
    ///
    /// Every channel is verified afresh. If any channel does not verify as connected, or the
    /// signal stream cannot be constructed, the session stays inactive and a notification
    /// explains why.
    pub async fn start_session(&self) -> Result<SessionStatus> {
        self.inner.ensure_running()?;

        let _transition = self.inner.transition_lock.lock().await;
        self.inner.ensure_running()?;

        Ok(self.inner.start_locked().await)
    }

    /// Stops the active session, if any, closing its signal stream.
    pub async fn stop_session(&self) -> Result<SessionStatus> {
        self.inner.ensure_running()?;

        let _transition = self.inner.transition_lock.lock().await;

        // Stream close failures are logged; the session is inactive regardless
        let _ = self
            .inner
            .stop_locked(Notification::session_stopped("stopped by user"))
            .await;

        Ok(SessionStatus::Inactive)
    }

    /// Stops the active session, or starts one if none is active.
    pub async fn toggle_session(&self) -> Result<SessionStatus> {
        self.inner.ensure_running()?;

        let _transition = self.inner.transition_lock.lock().await;
        self.inner.ensure_running()?;

        if self.inner.state_manager.status() == SessionStatus::Active {
            let _ = self
                .inner
                .stop_locked(Notification::session_stopped("stopped by user"))
                .await;

            return Ok(SessionStatus::Inactive);
        }

        Ok(self.inner.start_locked().await)
    }

    /// Returns the current state as a snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state_manager.snapshot()
    }

    /// Creates a new receiver for session updates.
    pub fn update_receiver(&self) -> SessionReceiver {
        self.inner.state_manager.update_receiver()
    }

    /// Returns a [`SessionReader`] that outlives borrows of the coordinator.
    pub fn reader(&self) -> Arc<dyn SessionReader> {
        self.inner.state_manager.clone()
    }

    /// Stops the active session, if any, and rejects every later operation.
    ///
    /// Returns an error if the coordinator was already shut down, or if the signal stream did not
    /// close cleanly. In the latter case the stream task is aborted and the session is inactive.
    pub async fn shutdown(&self) -> Result<()> {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return Err(SessionError::ShutDown);
        }

        let _transition = self.inner.transition_lock.lock().await;

        self.inner
            .stop_locked(Notification::session_stopped("coordinator shut down"))
            .await
            .map_err(|e| SessionError::Stream(Arc::new(e)))
    }
}
