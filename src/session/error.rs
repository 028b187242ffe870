use std::{result, sync::Arc};

use thiserror::Error;

use sensoria_bridge::error::RestApiError;

use crate::{stream::error::StreamError, verify::ChannelId};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session coordinator was already shut down")]
    ShutDown,

    #[error("Unknown channel `{0}`")]
    UnknownChannel(ChannelId),

    #[error("Duplicate channel `{0}`")]
    DuplicateChannel(ChannelId),

    #[error("At least one channel must be configured")]
    NoChannels,

    #[error("A stream connector must be configured")]
    NoStreamConnector,

    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    #[error("[RestClient] {0}")]
    RestClient(#[from] RestApiError),

    #[error("[Stream] {0}")]
    Stream(Arc<StreamError>),
}

pub(crate) type Result<T> = result::Result<T, SessionError>;
