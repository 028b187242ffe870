use std::time::Duration;

use reqwest::StatusCode;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};

use crate::config::BridgeConfig;

use super::{RestClient, error::RestApiError};

/// Serves a single canned HTTP response and returns the request head it received.
async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let api_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        String::from_utf8_lossy(&request).to_string()
    });

    (api_url, handle)
}

fn client_for(api_url: &str) -> std::sync::Arc<RestClient> {
    let config = BridgeConfig::default()
        .with_api_url(api_url)
        .with_rest_timeout(Duration::from_secs(2));

    RestClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_verify_connection_posts_and_decodes_peer() {
    let (api_url, server) = serve_once(
        "200 OK",
        r#"{"connected": true, "client_address": "10.0.0.5", "total_signals": 4}"#,
    )
    .await;

    let res = client_for(&api_url).verify_connection().await.unwrap();

    assert!(res.connected());
    assert_eq!(res.client_address(), Some("10.0.0.5"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /verify-connection HTTP/1.1"));
}

#[tokio::test]
async fn test_verify_connection_not_connected_is_not_an_error() {
    let (api_url, _server) = serve_once("200 OK", r#"{"connected": false}"#).await;

    let res = client_for(&api_url).verify_connection().await.unwrap();

    assert!(!res.connected());
}

#[tokio::test]
async fn test_verify_connection_server_error() {
    let (api_url, _server) = serve_once("500 Internal Server Error", r#"{"detail": "boom"}"#).await;

    let err = client_for(&api_url).verify_connection().await.unwrap_err();

    match err {
        RestApiError::ErrorResponse { status, text } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(text.contains("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_verify_connection_malformed_body() {
    let (api_url, _server) = serve_once("200 OK", "not json").await;

    let err = client_for(&api_url).verify_connection().await.unwrap_err();

    assert!(matches!(
        err,
        RestApiError::ResponseJsonDeserializeFailed { ref raw_response, .. } if raw_response == "not json"
    ));
}

#[tokio::test]
async fn test_verify_connection_unreachable() {
    // Bind and drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let api_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client_for(&api_url).verify_connection().await.unwrap_err();

    assert!(err.is_unreachable());
}

#[tokio::test]
async fn test_last_signal_not_found_is_none() {
    let (api_url, _server) =
        serve_once("404 Not Found", r#"{"detail": "No signals received yet"}"#).await;

    let res = client_for(&api_url).last_signal().await.unwrap();

    assert!(res.is_none());
}

#[tokio::test]
async fn test_history_sends_limit() {
    let (api_url, server) = serve_once(
        "200 OK",
        r#"{"count": 1, "signals": [{"signal": "izquierda", "timestamp": "2025-01-01T00:00:00"}]}"#,
    )
    .await;

    let history = client_for(&api_url).history(5).await.unwrap();

    assert_eq!(history.count(), 1);
    assert_eq!(history.signals()[0].signal(), "izquierda");

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /history?limit=5 HTTP/1.1"));
}

#[test]
fn test_invalid_api_url() {
    let config = BridgeConfig::default().with_api_url("not a url");

    assert!(matches!(
        RestClient::new(&config),
        Err(RestApiError::UrlParse(_))
    ));
}
