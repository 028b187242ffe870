use std::{result, time::Duration};

use thiserror::Error;
use tokio::task::JoinError;

use sensoria_bridge::error::WebSocketConnectionError;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Signal stream is already open")]
    AlreadyOpen,

    #[error("Invalid stream target: {0}")]
    InvalidTarget(WebSocketConnectionError),

    #[error("[Connect] {0}")]
    Connect(WebSocketConnectionError),

    #[error("[Transport] {0}")]
    Transport(WebSocketConnectionError),

    #[error("No frame received for two heartbeat intervals ({0:?})")]
    HeartbeatTimeout(Duration),

    #[error("Close frame not confirmed by the bridge within {0:?}")]
    NoCloseConfirmation(Duration),

    #[error("Stream task did not stop within {0:?}")]
    CloseTimeout(Duration),

    #[error("[TaskJoin] {0}")]
    TaskJoin(JoinError),

    #[error("Stream error: {0}")]
    Generic(String),
}

pub(crate) type Result<T> = result::Result<T, StreamError>;
