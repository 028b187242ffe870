use std::sync::Arc;

use reqwest::Method;

use super::config::RestClientConfig;

mod base;
pub(crate) mod error;
pub(crate) mod models;

#[cfg(test)]
mod tests;

use base::{BridgePath, BridgeRestBase};
use error::Result;
use models::{BridgeStatus, ServiceInfo, SignalHistory, SignalRecord, VerifyConnection};

/// Client for the bridge's REST API.
///
/// `RestClient` is cheap to share behind an [`Arc`] and performs exactly one HTTP request per
/// method call, without retries. Every request is bounded by the configured timeout.
pub struct RestClient {
    base: BridgeRestBase,
}

impl RestClient {
    /// Creates a new REST client.
    ///
    /// # Examples
    ///
    /// ```
    /// use sensoria_bridge::{BridgeConfig, RestClient};
    ///
    /// let client = RestClient::new(&BridgeConfig::default()).unwrap();
    /// ```
    pub fn new(config: impl Into<RestClientConfig>) -> Result<Arc<Self>> {
        let base = BridgeRestBase::new(&config.into())?;

        Ok(Arc::new(Self { base }))
    }

    /// Asks the bridge whether an acquisition client is currently attached.
    ///
    /// Non-2xx responses and malformed bodies are returned as errors, distinct from a
    /// well-formed response with `connected: false`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// use sensoria_bridge::{BridgeConfig, RestClient};
    ///
    /// let client = RestClient::new(&BridgeConfig::default())?;
    /// let verification = client.verify_connection().await?;
    ///
    /// if verification.connected() {
    ///     println!("Client at {:?}", verification.client_address());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn verify_connection(&self) -> Result<VerifyConnection> {
        self.base
            .make_request_without_params(Method::POST, BridgePath::VerifyConnection)
            .await
    }

    /// Fetches the bridge's service information.
    pub async fn service_info(&self) -> Result<ServiceInfo> {
        self.base
            .make_request_without_params(Method::GET, BridgePath::Root)
            .await
    }

    /// Fetches the bridge's current acquisition status.
    pub async fn status(&self) -> Result<BridgeStatus> {
        self.base
            .make_request_without_params(Method::GET, BridgePath::Status)
            .await
    }

    /// Fetches the last signal received by the bridge, or `None` if none was received yet.
    pub async fn last_signal(&self) -> Result<Option<SignalRecord>> {
        self.base
            .make_optional_request(Method::GET, BridgePath::LastSignal, None)
            .await
    }

    /// Fetches up to `limit` of the most recent signals. A `limit` of `0` returns every signal
    /// retained by the bridge.
    pub async fn history(&self, limit: usize) -> Result<SignalHistory> {
        self.base
            .make_request_with_query_params(
                Method::GET,
                BridgePath::History,
                vec![("limit", limit.to_string())],
            )
            .await
    }
}
