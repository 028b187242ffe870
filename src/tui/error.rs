use std::{io, result, sync::Arc};

use thiserror::Error;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc::error::SendError},
    task::JoinError,
};

use crate::session::error::SessionError;

use super::{SessionUiMessage, TuiCommand, TuiStatus, TuiStatusStopped};

#[derive(Error, Debug)]
pub enum TuiError {
    #[error("TUI not running error: {0}")]
    TuiNotRunning(TuiStatus),

    #[error("Terminal setup error: {0}")]
    TerminalSetup(io::Error),

    #[error("Terminal restore error: {0}")]
    TerminalRestore(io::Error),

    #[error("Terminal event read error, {0}")]
    TerminalEventRead(io::Error),

    #[error("Draw failed, terminal already restored")]
    DrawTerminalAlreadyRestored,

    #[error("Draw failed error: {0}")]
    DrawFailed(io::Error),

    #[error("Open log file error: {0}")]
    LogFileOpen(io::Error),

    #[error("Write to log file error: {0}")]
    LogFileWrite(io::Error),

    #[error("Failed to send TUI command error: {0}")]
    SendCommandFailed(Box<SendError<TuiCommand>>),

    #[error("Session TUI send failed: {0}")]
    SessionTuiSendFailed(Box<SendError<SessionUiMessage>>),

    #[error("Session recv error: {0}")]
    SessionRecv(RecvError),

    #[error("TUI already shutdown error")]
    TuiAlreadyShutdown,

    #[error("TUI crashed without status update error")]
    TuiCrashedWithoutStatusUpdate,

    #[error("TaskJoin error {0}")]
    TaskJoin(JoinError),

    #[error("TUI shutdown timeout error")]
    ShutdownTimeout,

    #[error("TUI shutdown failed: {0}")]
    ShutdownFailed(Arc<TuiStatusStopped>),

    #[error("Session shutdown failed: {0}")]
    SessionShutdownFailed(SessionError),
}

pub(crate) type Result<T> = result::Result<T, TuiError>;
