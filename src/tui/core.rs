use std::{
    fs::{File, OpenOptions},
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use ratatui::{
    backend::Backend,
    crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
};
use tokio::{sync::mpsc, task, time};

use crate::{
    session::{SessionCoordinator, error::SessionError},
    util::{AbortOnDropHandle, DateTimeExt},
};

use super::{
    SessionUiMessage, TuiCommand,
    error::{Result, TuiError},
    status::{TuiStatus, TuiStatusManager},
    terminal::TuiTerminal,
    view::SessionTuiView,
};

pub(super) type UiTaskHandle = Arc<Mutex<Option<AbortOnDropHandle<()>>>>;

/// Waits up to the given duration for a key press.
pub(super) type KeyReader = fn(Duration) -> Result<Option<KeyEvent>>;

/// Prefixes `text` with the current local time.
pub(super) fn timestamped(text: &str) -> String {
    format!("{} {text}", Utc::now().format_local_time_millis())
}

pub(super) fn open_log_file(log_file_path: Option<&str>) -> Result<Option<File>> {
    log_file_path
        .map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(TuiError::LogFileOpen)
        })
        .transpose()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum KeyAction {
    Command(TuiCommand),
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    ResetScroll,
    ScrollToBottom,
    SwitchPane,
}

pub(super) fn key_action(key: KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let action = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            KeyAction::Command(TuiCommand::Shutdown)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            KeyAction::Command(TuiCommand::Shutdown)
        }
        KeyCode::Char('v') | KeyCode::Char('V') => KeyAction::Command(TuiCommand::Verify),
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char(' ') => {
            KeyAction::Command(TuiCommand::ToggleSession)
        }
        KeyCode::Up => KeyAction::ScrollUp,
        KeyCode::Down => KeyAction::ScrollDown,
        KeyCode::Left => KeyAction::ScrollLeft,
        KeyCode::Right => KeyAction::ScrollRight,
        KeyCode::Char('t') | KeyCode::Char('T') => KeyAction::ResetScroll,
        KeyCode::Char('b') | KeyCode::Char('B') => KeyAction::ScrollToBottom,
        KeyCode::Tab => KeyAction::SwitchPane,
        _ => return None,
    };

    Some(action)
}

pub(super) fn read_key(timeout: Duration) -> Result<Option<KeyEvent>> {
    if !event::poll(timeout).map_err(TuiError::TerminalEventRead)? {
        return Ok(None);
    }

    match event::read().map_err(TuiError::TerminalEventRead)? {
        Event::Key(key) => Ok(Some(key)),
        _ => Ok(None),
    }
}

/// Applies every pending UI message. Returns `true` once shutdown has completed.
fn drain_ui_messages(
    tui_view: &SessionTuiView,
    ui_rx: &mut mpsc::Receiver<SessionUiMessage>,
) -> Result<bool> {
    while let Ok(message) = ui_rx.try_recv() {
        if tui_view.handle_ui_message(message)? {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn run_ui<B: Backend>(
    event_check_interval: Duration,
    tui_view: Arc<SessionTuiView>,
    tui_terminal: Arc<TuiTerminal<B>>,
    mut ui_rx: mpsc::Receiver<SessionUiMessage>,
    command_tx: mpsc::Sender<TuiCommand>,
    read_key: KeyReader,
) -> Result<()> {
    loop {
        task::yield_now().await;

        if drain_ui_messages(&tui_view, &mut ui_rx)? {
            return Ok(());
        }

        tui_terminal.draw(&tui_view)?;

        let Some(action) = read_key(event_check_interval)?.and_then(key_action) else {
            continue;
        };

        match action {
            KeyAction::Command(command) => {
                command_tx
                    .send(command)
                    .await
                    .map_err(|e| TuiError::SendCommandFailed(Box::new(e)))?;

                if command == TuiCommand::Shutdown {
                    tui_view.add_log_entry(timestamped("Shutting down..."))?;
                    break;
                }
            }
            KeyAction::ScrollUp => tui_view.scroll_up(),
            KeyAction::ScrollDown => tui_view.scroll_down(),
            KeyAction::ScrollLeft => tui_view.scroll_left(),
            KeyAction::ScrollRight => tui_view.scroll_right(),
            KeyAction::ResetScroll => tui_view.reset_scroll(),
            KeyAction::ScrollToBottom => tui_view.scroll_to_bottom(),
            KeyAction::SwitchPane => tui_view.switch_pane(),
        }
    }

    // Input is ignored while the coordinator shuts down
    loop {
        tui_terminal.draw(&tui_view)?;
        time::sleep(event_check_interval).await;

        if drain_ui_messages(&tui_view, &mut ui_rx)? {
            return Ok(());
        }
    }
}

pub(super) fn spawn_ui_task<B: Backend + Send + 'static>(
    event_check_interval: Duration,
    tui_view: Arc<SessionTuiView>,
    status_manager: Arc<TuiStatusManager>,
    tui_terminal: Arc<TuiTerminal<B>>,
    ui_rx: mpsc::Receiver<SessionUiMessage>,
    command_tx: mpsc::Sender<TuiCommand>,
    read_key: KeyReader,
) -> UiTaskHandle {
    Arc::new(Mutex::new(Some(
        tokio::spawn(async move {
            if let Err(e) = run_ui(
                event_check_interval,
                tui_view,
                tui_terminal,
                ui_rx,
                command_tx,
                read_key,
            )
            .await
            {
                status_manager.set_crashed(e);
            }
        })
        .into(),
    )))
}

/// Shuts down the coordinator, then waits for the UI task to finish. Can only succeed once.
pub(super) async fn shutdown_inner(
    shutdown_timeout: Duration,
    status_manager: Arc<TuiStatusManager>,
    ui_task_handle: UiTaskHandle,
    ui_tx: &mpsc::Sender<SessionUiMessage>,
    coordinator: &SessionCoordinator,
) -> Result<()> {
    let Some(mut handle) = ui_task_handle
        .lock()
        .expect("`ui_task_handle` mutex can't be poisoned")
        .take()
    else {
        return Err(TuiError::TuiAlreadyShutdown);
    };

    if handle.is_finished() {
        // The UI task crashed, its error is expected in the status
        let status_not_running = match status_manager.status() {
            TuiStatus::Running => status_manager
                .set_crashed(TuiError::TuiCrashedWithoutStatusUpdate)
                .into(),
            status_not_running => status_not_running,
        };

        return Err(TuiError::TuiNotRunning(status_not_running));
    }

    status_manager.set_shutdown_initiated();

    let shutdown_procedure = async {
        let session_res = match time::timeout(shutdown_timeout, coordinator.shutdown()).await {
            Ok(Ok(())) | Ok(Err(SessionError::ShutDown)) => Ok(()),
            Ok(Err(e)) => Err(TuiError::SessionShutdownFailed(e)),
            Err(_) => Err(TuiError::ShutdownTimeout),
        };

        let ui_message_res = ui_tx
            .send(SessionUiMessage::ShutdownCompleted)
            .await
            .map_err(|e| TuiError::SessionTuiSendFailed(Box::new(e)));

        if ui_message_res.is_err() {
            handle.abort();
        }

        session_res.and(ui_message_res)?;

        tokio::select! {
            join_res = &mut handle => join_res.map_err(TuiError::TaskJoin),
            _ = time::sleep(shutdown_timeout) => {
                handle.abort();
                Err(TuiError::ShutdownTimeout)
            }
        }
    };

    match shutdown_procedure.await {
        Ok(()) => {
            status_manager.set_shutdown();
            Ok(())
        }
        Err(e) => Err(TuiError::ShutdownFailed(status_manager.set_crashed(e))),
    }
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, crossterm::event::KeyEventState};

    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(
            key_action(press(KeyCode::Char('v'))),
            Some(KeyAction::Command(TuiCommand::Verify))
        );
        assert_eq!(
            key_action(press(KeyCode::Char(' '))),
            Some(KeyAction::Command(TuiCommand::ToggleSession))
        );
        assert_eq!(
            key_action(press(KeyCode::Char('Q'))),
            Some(KeyAction::Command(TuiCommand::Shutdown))
        );
        assert_eq!(
            key_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Command(TuiCommand::Shutdown))
        );
        assert_eq!(key_action(press(KeyCode::Tab)), Some(KeyAction::SwitchPane));
        assert_eq!(key_action(press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn key_releases_are_ignored() {
        let release = KeyEvent {
            code: KeyCode::Char('s'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };

        assert_eq!(key_action(release), None);
    }

    #[tokio::test]
    async fn ui_task_draws_until_shutdown_completed() {
        let tui_view = SessionTuiView::new(10, None);
        let status_manager = TuiStatusManager::new_running(tui_view.clone());
        let tui_terminal = TuiTerminal::with_backend(TestBackend::new(120, 30)).unwrap();
        let (ui_tx, ui_rx) = mpsc::channel(10);
        let (command_tx, _command_rx) = mpsc::channel(10);

        ui_tx
            .send(SessionUiMessage::LogEntry("bridge verified".to_string()))
            .await
            .unwrap();

        let handle = spawn_ui_task(
            Duration::from_millis(5),
            tui_view,
            status_manager.clone(),
            tui_terminal.clone(),
            ui_rx,
            command_tx,
            |timeout| {
                std::thread::sleep(timeout);
                Ok(None)
            },
        );

        time::sleep(Duration::from_millis(50)).await;

        let rendered = tui_terminal.rendered();
        assert!(rendered.contains("bridge verified"));
        assert!(rendered.contains("[v] verify"));

        ui_tx.send(SessionUiMessage::ShutdownCompleted).await.unwrap();

        let task = handle.lock().unwrap().take().unwrap();
        time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(status_manager.status(), TuiStatus::Running));
    }
}
