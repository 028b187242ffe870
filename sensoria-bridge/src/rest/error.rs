use std::result;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestApiError {
    #[error("Url parse error: {0}")]
    UrlParse(String),

    #[error("HttpClient error: {0}")]
    HttpClient(reqwest::Error),

    #[error("Request send failed: {0}")]
    SendFailed(reqwest::Error),

    #[error("Error response, status: {status}, text: {text}")]
    ErrorResponse { status: StatusCode, text: String },

    #[error("Response decoding error: {0}")]
    ResponseDecoding(reqwest::Error),

    #[error("Response JSON deserialize failed: {e}, raw response: {raw_response}")]
    ResponseJsonDeserializeFailed {
        raw_response: String,
        e: serde_json::Error,
    },
}

impl RestApiError {
    /// Returns `true` if the request never produced an HTTP response (connection refused,
    /// timeout, DNS failure, etc.).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::SendFailed(_))
    }

    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::SendFailed(e) | Self::ResponseDecoding(e) => e.is_timeout(),
            _ => false,
        }
    }
}

pub type Result<T> = result::Result<T, RestApiError>;
