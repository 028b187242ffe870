use std::{result, time::Duration};

use thiserror::Error;

use sensoria_bridge::error::RestApiError;

use crate::stream::error::StreamError;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("[Rest] {0}")]
    Rest(#[from] RestApiError),

    #[error("[StreamProbe] {0}")]
    StreamProbe(#[from] StreamError),

    #[error("Stream probe closed before confirmation, code {0:?}")]
    ProbeClosed(Option<u16>),

    #[error("Stream probe received unexpected connection status: {0}")]
    UnexpectedStatus(String),

    #[error("Verification timed out after {0:?}")]
    Timeout(Duration),
}

pub(crate) type Result<T> = result::Result<T, VerificationError>;
