use std::{io, result, time::Duration};

use fastwebsockets::{OpCode, WebSocketError};
use hyper::http;
use thiserror::Error;
use tokio_rustls::rustls::pki_types::InvalidDnsNameError;

#[derive(Error, Debug)]
pub enum WebSocketConnectionError {
    #[error("InvalidUrl error, {0}")]
    InvalidUrl(String),

    #[error("UnsupportedScheme error, {0}")]
    UnsupportedScheme(String),

    #[error("InvalidDnsName error, {0}")]
    InvalidDnsName(InvalidDnsNameError),

    #[error("CreateTcpStream error, {0}")]
    CreateTcpStream(io::Error),

    #[error("ConnectTlsStream error, {0}")]
    ConnectTlsStream(io::Error),

    #[error("HttpUpgradeRequest error, {0}")]
    HttpUpgradeRequest(http::Error),

    #[error("Handshake error, {0}")]
    Handshake(WebSocketError),

    #[error("HandshakeTimeout error, no upgrade after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("WriteFrame error, {0}")]
    WriteFrame(WebSocketError),

    #[error("ReadFrame error, {0}")]
    ReadFrame(WebSocketError),

    #[error("UnhandledOpCode error, {0:?}")]
    UnhandledOpCode(OpCode),
}

pub type ConnectionResult<T> = result::Result<T, WebSocketConnectionError>;
