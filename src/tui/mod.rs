use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    time,
};

use crate::{
    session::{SessionCoordinator, SessionReader, SessionSnapshot, SessionUpdate},
    util::AbortOnDropHandle,
};

mod config;
mod core;
pub(crate) mod error;
mod status;
mod terminal;
mod view;

pub use config::TuiConfig;
pub use status::{TuiStatus, TuiStatusStopped};

use self::core::{UiTaskHandle, timestamped};
use error::{Result, TuiError};
use status::TuiStatusManager;
use terminal::TuiTerminal;
use view::SessionTuiView;

#[derive(Debug)]
pub enum SessionUiMessage {
    Snapshot(Arc<SessionSnapshot>),
    LogEntry(String),
    ShutdownCompleted,
}

/// Operator command issued from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiCommand {
    Verify,
    ToggleSession,
    Shutdown,
}

/// Terminal user interface for a [`SessionCoordinator`].
///
/// `SessionTui` shows the session status, channel verification states, the current signal and
/// its history, and a log of notifications. The operator verifies channels with `v`, starts and
/// stops the session with `s`, and quits with `q`, which also shuts the coordinator down.
pub struct SessionTui {
    event_check_interval: Duration,
    shutdown_timeout: Duration,
    coordinator: Arc<SessionCoordinator>,
    status_manager: Arc<TuiStatusManager>,
    // Ownership ensures the terminal is restored when `SessionTui` is dropped
    tui_terminal: Arc<TuiTerminal>,
    ui_tx: mpsc::Sender<SessionUiMessage>,
    // Explicitly aborted on drop, so the terminal is restored before the drop completes
    ui_task_handle: UiTaskHandle,
    _update_listener_handle: AbortOnDropHandle<()>,
    _command_handler_handle: AbortOnDropHandle<()>,
}

impl SessionTui {
    /// Launches the TUI for `coordinator`.
    ///
    /// Optionally writes TUI logs to a file if `log_file_path` is provided.
    pub async fn launch(
        config: TuiConfig,
        coordinator: Arc<SessionCoordinator>,
        log_file_path: Option<&str>,
    ) -> Result<Arc<Self>> {
        let log_file = self::core::open_log_file(log_file_path)?;

        let (ui_tx, ui_rx) = mpsc::channel::<SessionUiMessage>(100);
        let (command_tx, command_rx) = mpsc::channel::<TuiCommand>(10);

        let tui_terminal = TuiTerminal::new()?;

        let tui_view = SessionTuiView::new(config.max_tui_log_len(), log_file);

        let status_manager = TuiStatusManager::new_running(tui_view.clone());

        let ui_task_handle = self::core::spawn_ui_task(
            config.event_check_interval(),
            tui_view,
            status_manager.clone(),
            tui_terminal.clone(),
            ui_rx,
            command_tx,
            self::core::read_key,
        );

        let _update_listener_handle = Self::spawn_session_update_listener(
            status_manager.clone(),
            coordinator.reader(),
            ui_tx.clone(),
        );

        let _command_handler_handle = Self::spawn_command_handler(
            config.shutdown_timeout(),
            status_manager.clone(),
            coordinator.clone(),
            ui_task_handle.clone(),
            ui_tx.clone(),
            command_rx,
        );

        Ok(Arc::new(Self {
            event_check_interval: config.event_check_interval(),
            shutdown_timeout: config.shutdown_timeout(),
            coordinator,
            status_manager,
            tui_terminal,
            ui_tx,
            ui_task_handle,
            _update_listener_handle,
            _command_handler_handle,
        }))
    }

    /// Returns the current [`TuiStatus`] as a snapshot.
    pub fn status(&self) -> TuiStatus {
        self.status_manager.status()
    }

    fn spawn_session_update_listener(
        status_manager: Arc<TuiStatusManager>,
        session_reader: Arc<dyn SessionReader>,
        ui_tx: mpsc::Sender<SessionUiMessage>,
    ) -> AbortOnDropHandle<()> {
        tokio::spawn(async move {
            let send_ui_msg = async |ui_msg: SessionUiMessage| -> Result<()> {
                ui_tx
                    .send(ui_msg)
                    .await
                    .map_err(|e| TuiError::SessionTuiSendFailed(Box::new(e)))
            };

            let handle_session_update = async |session_update: SessionUpdate| -> Result<()> {
                match session_update {
                    SessionUpdate::Snapshot(snapshot) => {
                        send_ui_msg(SessionUiMessage::Snapshot(snapshot)).await?;
                    }
                    SessionUpdate::Notification(notification) => {
                        send_ui_msg(SessionUiMessage::LogEntry(notification.to_string())).await?;
                    }
                    // Signals are shown through the snapshot that records them
                    SessionUpdate::Signal(_) => {}
                }
                Ok(())
            };

            let mut session_rx = session_reader.update_receiver();

            let initial = SessionUiMessage::Snapshot(Arc::new(session_reader.snapshot()));
            if let Err(e) = send_ui_msg(initial).await {
                status_manager.set_crashed(e);
                return;
            }

            loop {
                match session_rx.recv().await {
                    Ok(session_update) => {
                        if let Err(e) = handle_session_update(session_update).await {
                            status_manager.set_crashed(e);
                            return;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        let log_msg = timestamped(&format!(
                            "Session updates lagged by {skipped} messages"
                        ));
                        let resync = SessionUiMessage::Snapshot(Arc::new(session_reader.snapshot()));

                        if let Err(e) = async {
                            send_ui_msg(SessionUiMessage::LogEntry(log_msg)).await?;
                            send_ui_msg(resync).await
                        }
                        .await
                        {
                            status_manager.set_crashed(e);
                            return;
                        }
                    }
                    Err(e) => {
                        let status = status_manager.status();
                        if status.is_shutdown_initiated() || status.is_shutdown() {
                            return;
                        }

                        status_manager.set_crashed(TuiError::SessionRecv(e));

                        return;
                    }
                }
            }
        })
        .into()
    }

    fn spawn_command_handler(
        shutdown_timeout: Duration,
        status_manager: Arc<TuiStatusManager>,
        coordinator: Arc<SessionCoordinator>,
        ui_task_handle: UiTaskHandle,
        ui_tx: mpsc::Sender<SessionUiMessage>,
        mut command_rx: mpsc::Receiver<TuiCommand>,
    ) -> AbortOnDropHandle<()> {
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                tracing::debug!(?command, "TUI command");

                let res = match command {
                    TuiCommand::Verify => coordinator.verify().await.map(|_| ()),
                    TuiCommand::ToggleSession => coordinator.toggle_session().await.map(|_| ()),
                    TuiCommand::Shutdown => {
                        // Error handling via `TuiStatusManager`
                        let _ = self::core::shutdown_inner(
                            shutdown_timeout,
                            status_manager,
                            ui_task_handle,
                            &ui_tx,
                            &coordinator,
                        )
                        .await;
                        return;
                    }
                };

                if let Err(e) = res {
                    let log_msg = timestamped(&format!("Command {command:?} failed: {e}"));
                    if let Err(e) = ui_tx.send(SessionUiMessage::LogEntry(log_msg)).await {
                        status_manager.set_crashed(TuiError::SessionTuiSendFailed(Box::new(e)));
                        return;
                    }
                }
            }
        })
        .into()
    }

    /// Performs a graceful shutdown of the coordinator and the TUI.
    ///
    /// If shutdown does not complete within the configured timeout, the UI task is aborted.
    ///
    /// Returns an error if the TUI is not running or if shutdown fails.
    pub async fn shutdown(&self) -> Result<()> {
        self.status_manager.require_running()?;

        self::core::shutdown_inner(
            self.shutdown_timeout,
            self.status_manager.clone(),
            self.ui_task_handle.clone(),
            &self.ui_tx,
            &self.coordinator,
        )
        .await
    }

    /// Waits until the TUI has stopped and returns the final stopped status.
    ///
    /// The terminal is restored before this method returns.
    pub async fn until_stopped(&self) -> Arc<TuiStatusStopped> {
        loop {
            if let TuiStatus::Stopped(status_stopped) = self.status() {
                let _ = self.tui_terminal.restore();
                return status_stopped;
            }

            time::sleep(self.event_check_interval).await;
        }
    }

    /// Logs a message to the TUI.
    ///
    /// Returns an error if the TUI is not running or if sending the log entry fails.
    pub async fn log(&self, text: String) -> Result<()> {
        self.status_manager.require_running()?;

        self.ui_tx
            .send(SessionUiMessage::LogEntry(timestamped(&text)))
            .await
            .map_err(|e| TuiError::SessionTuiSendFailed(Box::new(e)))
    }
}

impl Drop for SessionTui {
    fn drop(&mut self) {
        if let Some(ui_handle) = self
            .ui_task_handle
            .lock()
            .expect("`ui_task_handle` mutex can't be poisoned")
            .take()
        {
            ui_handle.abort();
        };
    }
}
