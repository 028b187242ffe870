use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    notification::Notification,
    stream::{SignalReading, StreamPhase},
    verify::{ChannelId, ConnectionState},
};

/// State of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Inactive,
    Starting,
    Active,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Inactive => write!(f, "Inactive"),
            SessionStatus::Starting => write!(f, "Starting"),
            SessionStatus::Active => write!(f, "Active"),
        }
    }
}

/// Verification state of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    id: ChannelId,
    state: ConnectionState,
    peer: Option<String>,
}

impl ChannelSnapshot {
    pub(crate) fn new(id: ChannelId) -> Self {
        Self {
            id,
            state: ConnectionState::Disconnected,
            peer: None,
        }
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Peer reported by the last successful verification.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        if state != ConnectionState::Connected {
            self.peer = None;
        }
    }

    pub(crate) fn set_connected(&mut self, peer: Option<String>) {
        self.state = ConnectionState::Connected;
        self.peer = peer;
    }
}

/// Read-only view of the coordinator's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    status: SessionStatus,
    session_id: Option<Uuid>,
    channels: Vec<ChannelSnapshot>,
    stream_phase: StreamPhase,
    stream_connected: bool,
    current_signal: Option<SignalReading>,
    signal_history: VecDeque<SignalReading>,
    total_signals: u64,
}

impl SessionSnapshot {
    pub(crate) fn new(channels: impl IntoIterator<Item = ChannelId>) -> Self {
        Self {
            status: SessionStatus::Inactive,
            session_id: None,
            channels: channels.into_iter().map(ChannelSnapshot::new).collect(),
            stream_phase: StreamPhase::Closed,
            stream_connected: false,
            current_signal: None,
            signal_history: VecDeque::new(),
            total_signals: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Identifier of the active session.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn channels(&self) -> &[ChannelSnapshot] {
        &self.channels
    }

    pub fn channel(&self, id: &ChannelId) -> Option<&ChannelSnapshot> {
        self.channels.iter().find(|channel| channel.id() == id)
    }

    pub fn stream_phase(&self) -> &StreamPhase {
        &self.stream_phase
    }

    /// Whether the signal stream is currently delivering frames.
    pub fn stream_connected(&self) -> bool {
        self.stream_connected
    }

    /// The most recent signal of the active session. Always `None` while no session is active.
    pub fn current_signal(&self) -> Option<&SignalReading> {
        self.current_signal.as_ref()
    }

    /// Most recent signals of the last session, oldest first.
    pub fn signal_history(&self) -> &VecDeque<SignalReading> {
        &self.signal_history
    }

    /// Number of signals received during the last session.
    pub fn total_signals(&self) -> u64 {
        self.total_signals
    }

    pub(crate) fn channel_mut(&mut self, id: &ChannelId) -> Option<&mut ChannelSnapshot> {
        self.channels.iter_mut().find(|channel| channel.id() == id)
    }

    pub(crate) fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    pub(crate) fn set_stream(&mut self, phase: StreamPhase, connected: bool) {
        self.stream_phase = phase;
        self.stream_connected = connected;
    }

    pub(crate) fn activate(&mut self, session_id: Uuid) {
        self.status = SessionStatus::Active;
        self.session_id = Some(session_id);
        self.stream_phase = StreamPhase::Opening;
        self.stream_connected = false;
        self.current_signal = None;
        self.signal_history.clear();
        self.total_signals = 0;
    }

    /// Detaches the active session, clearing everything only meaningful while it is active.
    pub(crate) fn detach(&mut self) {
        self.session_id = None;
        self.current_signal = None;
        self.stream_connected = false;
    }

    pub(crate) fn deactivate(&mut self) {
        self.detach();
        self.status = SessionStatus::Inactive;
        self.stream_phase = StreamPhase::Closed;
    }

    pub(crate) fn record_signal(&mut self, reading: SignalReading, history_len: usize) {
        if history_len > 0 {
            while self.signal_history.len() >= history_len {
                self.signal_history.pop_front();
            }
            self.signal_history.push_back(reading.clone());
        }
        self.current_signal = Some(reading);
        self.total_signals += 1;
    }
}

/// An update published by the session coordinator.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Snapshot(Arc<SessionSnapshot>),
    Signal(SignalReading),
    Notification(Notification),
}

pub type SessionReceiver = broadcast::Receiver<SessionUpdate>;

pub(crate) type SessionTransmitter = broadcast::Sender<SessionUpdate>;

/// Trait for reading session state and subscribing to updates.
pub trait SessionReader: Send + Sync + 'static {
    /// Creates a new receiver for session updates.
    fn update_receiver(&self) -> SessionReceiver;

    /// Returns the current state as a snapshot.
    fn snapshot(&self) -> SessionSnapshot;
}

pub(crate) struct SessionStateManager {
    state: Mutex<SessionSnapshot>,
    update_tx: SessionTransmitter,
}

impl SessionStateManager {
    pub fn new(initial: SessionSnapshot, update_capacity: usize) -> Arc<Self> {
        let (update_tx, _) = broadcast::channel(update_capacity.max(1));

        Arc::new(Self {
            state: Mutex::new(initial),
            update_tx,
        })
    }

    fn get_state(&self) -> MutexGuard<'_, SessionSnapshot> {
        self.state
            .lock()
            .expect("`SessionStateManager` mutex can't be poisoned")
    }

    /// Applies `f` and publishes the resulting snapshot.
    pub fn update_with<R>(&self, f: impl FnOnce(&mut SessionSnapshot) -> R) -> R {
        let mut state_guard = self.get_state();

        let res = f(&mut state_guard);
        let snapshot = Arc::new(state_guard.clone());
        drop(state_guard);

        // Ignore no-receivers errors
        let _ = self.update_tx.send(SessionUpdate::Snapshot(snapshot));

        res
    }

    /// Applies `f` and publishes the resulting snapshot only if it returns `Some`.
    pub fn update_if<R>(&self, f: impl FnOnce(&mut SessionSnapshot) -> Option<R>) -> Option<R> {
        let mut state_guard = self.get_state();

        let res = f(&mut state_guard)?;
        let snapshot = Arc::new(state_guard.clone());
        drop(state_guard);

        let _ = self.update_tx.send(SessionUpdate::Snapshot(snapshot));

        Some(res)
    }

    pub fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) {
        self.update_with(f)
    }

    pub fn status(&self) -> SessionStatus {
        self.get_state().status()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.get_state().session_id()
    }

    pub fn channel_state(&self, id: &ChannelId) -> Option<ConnectionState> {
        self.get_state().channel(id).map(|channel| channel.state())
    }

    pub fn send(&self, update: SessionUpdate) {
        if let SessionUpdate::Notification(notification) = &update {
            notification.log();
        }

        let _ = self.update_tx.send(update);
    }

    pub fn notify(&self, notification: Notification) {
        self.send(SessionUpdate::Notification(notification));
    }
}

impl SessionReader for SessionStateManager {
    fn update_receiver(&self) -> SessionReceiver {
        self.update_tx.subscribe()
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.get_state().clone()
    }
}
