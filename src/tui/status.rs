use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{
    core::timestamped,
    error::{Result, TuiError},
    view::SessionTuiView,
};

/// Detailed status when the TUI has stopped running.
#[derive(Debug)]
pub enum TuiStatusStopped {
    /// TUI stopped due to a fatal error.
    Crashed(TuiError),
    /// TUI stopped due to a graceful shutdown.
    Shutdown,
}

/// Overall TUI status.
#[derive(Debug, Clone)]
pub enum TuiStatus {
    Running,
    ShutdownInitiated,
    Stopped(Arc<TuiStatusStopped>),
}

impl fmt::Display for TuiStatusStopped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crashed(error) => write!(f, "Crashed: {error}"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

impl fmt::Display for TuiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::ShutdownInitiated => write!(f, "Shutdown Initiated"),
            Self::Stopped(status) => write!(f, "Stopped: {status}"),
        }
    }
}

impl TuiStatus {
    pub fn is_crashed(&self) -> bool {
        matches!(self, TuiStatus::Stopped(stopped) if matches!(stopped.as_ref(), TuiStatusStopped::Crashed(_)))
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        matches!(self, TuiStatus::ShutdownInitiated)
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, TuiStatus::Stopped(stopped) if matches!(stopped.as_ref(), TuiStatusStopped::Shutdown))
    }
}

impl From<TuiStatusStopped> for TuiStatus {
    fn from(value: TuiStatusStopped) -> Self {
        Self::Stopped(Arc::new(value))
    }
}

impl From<Arc<TuiStatusStopped>> for TuiStatus {
    fn from(value: Arc<TuiStatusStopped>) -> Self {
        Self::Stopped(value)
    }
}

pub(super) struct TuiStatusManager {
    tui_view: Arc<SessionTuiView>,
    status: Mutex<TuiStatus>,
}

impl TuiStatusManager {
    pub fn new_running(tui_view: Arc<SessionTuiView>) -> Arc<Self> {
        Arc::new(Self {
            tui_view,
            status: Mutex::new(TuiStatus::Running),
        })
    }

    fn get_status(&self) -> MutexGuard<'_, TuiStatus> {
        self.status
            .lock()
            .expect("`TuiStatusManager` mutex can't be poisoned")
    }

    pub fn status(&self) -> TuiStatus {
        self.get_status().clone()
    }

    fn set(&self, new_status: TuiStatus) {
        let mut status = self.get_status();

        // A crash is final
        if status.is_crashed() {
            return;
        }

        tracing::info!(status = %new_status, "TUI status changed");
        let _ = self
            .tui_view
            .add_log_entry(timestamped(&format!("TUI status: {new_status}")));

        *status = new_status;
    }

    pub fn set_crashed(&self, error: TuiError) -> Arc<TuiStatusStopped> {
        tracing::error!(%error, "TUI crashed");

        let status_stopped = Arc::new(TuiStatusStopped::Crashed(error));
        self.set(status_stopped.clone().into());

        status_stopped
    }

    pub fn set_shutdown_initiated(&self) {
        self.set(TuiStatus::ShutdownInitiated);
    }

    pub fn set_shutdown(&self) {
        self.set(TuiStatusStopped::Shutdown.into());
    }

    pub fn require_running(&self) -> Result<()> {
        match self.status() {
            TuiStatus::Running => Ok(()),
            status_not_running => Err(TuiError::TuiNotRunning(status_not_running)),
        }
    }
}
