use std::time::Duration;

/// Configuration for the bridge's [`RestClient`] and signal stream.
///
/// The bridge exposes its REST API under `api_url` and pushes classified signals over the
/// WebSocket endpoint at `stream_url`. Both addresses are configuration values; the defaults
/// target a bridge running on the local machine.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sensoria_bridge::BridgeConfig;
///
/// // Use default configuration
/// let config = BridgeConfig::default();
///
/// // Customize configuration
/// let config = BridgeConfig::default()
///     .with_api_url("http://10.0.0.2:8000")
///     .with_stream_url("ws://10.0.0.2:8000/ws/signals")
///     .with_rest_timeout(Duration::from_secs(3));
/// ```
///
/// [`RestClient`]: crate::RestClient
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    api_url: String,
    stream_url: String,
    rest_timeout: Duration,
    ws_handshake_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            stream_url: "ws://localhost:8000/ws/signals".to_string(),
            rest_timeout: Duration::from_secs(5),
            ws_handshake_timeout: Duration::from_secs(5),
        }
    }
}

impl BridgeConfig {
    /// Returns the base URL of the bridge's REST API.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Returns the URL of the bridge's signal stream.
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Returns the configured timeout for REST API requests.
    pub fn rest_timeout(&self) -> Duration {
        self.rest_timeout
    }

    /// Returns the configured timeout for the WebSocket opening handshake.
    pub fn ws_handshake_timeout(&self) -> Duration {
        self.ws_handshake_timeout
    }

    /// Sets the base URL of the REST API. The default is `http://localhost:8000`.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Sets the signal stream URL. The default is `ws://localhost:8000/ws/signals`.
    ///
    /// Both `ws://` and `wss://` URLs are supported.
    pub fn with_stream_url(mut self, stream_url: impl Into<String>) -> Self {
        self.stream_url = stream_url.into();
        self
    }

    /// Sets the REST API request timeout. The default is 5 seconds.
    pub fn with_rest_timeout(mut self, timeout: Duration) -> Self {
        self.rest_timeout = timeout;
        self
    }

    /// Sets the WebSocket handshake timeout. The default is 5 seconds.
    pub fn with_ws_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.ws_handshake_timeout = timeout;
        self
    }
}

#[derive(Clone, Debug)]
pub struct RestClientConfig {
    api_url: String,
    timeout: Duration,
}

impl RestClientConfig {
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&BridgeConfig> for RestClientConfig {
    fn from(value: &BridgeConfig) -> Self {
        Self {
            api_url: value.api_url().to_string(),
            timeout: value.rest_timeout(),
        }
    }
}

impl Default for RestClientConfig {
    fn default() -> Self {
        (&BridgeConfig::default()).into()
    }
}

#[derive(Clone, Debug)]
pub struct WebSocketClientConfig {
    stream_url: String,
    handshake_timeout: Duration,
}

impl WebSocketClientConfig {
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }
}

impl From<&BridgeConfig> for WebSocketClientConfig {
    fn from(value: &BridgeConfig) -> Self {
        Self {
            stream_url: value.stream_url().to_string(),
            handshake_timeout: value.ws_handshake_timeout(),
        }
    }
}

impl Default for WebSocketClientConfig {
    fn default() -> Self {
        (&BridgeConfig::default()).into()
    }
}
