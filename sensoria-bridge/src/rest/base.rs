use reqwest::{self, Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::{
    super::config::RestClientConfig,
    error::{RestApiError, Result},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BridgePath {
    Root,
    Status,
    LastSignal,
    History,
    VerifyConnection,
}

impl BridgePath {
    fn as_str(&self) -> &'static str {
        match self {
            BridgePath::Root => "/",
            BridgePath::Status => "/status",
            BridgePath::LastSignal => "/last-signal",
            BridgePath::History => "/history",
            BridgePath::VerifyConnection => "/verify-connection",
        }
    }
}

pub(crate) struct BridgeRestBase {
    api_url: Url,
    client: Client,
}

impl BridgeRestBase {
    pub fn new(config: &RestClientConfig) -> Result<Self> {
        let api_url =
            Url::parse(config.api_url()).map_err(|e| RestApiError::UrlParse(e.to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(RestApiError::HttpClient)?;

        Ok(Self { api_url, client })
    }

    fn get_url(&self, path: BridgePath, query_params: Option<String>) -> Result<Url> {
        let mut url = self
            .api_url
            .join(path.as_str())
            .map_err(|e| RestApiError::UrlParse(e.to_string()))?;

        url.set_query(query_params.as_deref());

        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        path: BridgePath,
        query_params: Option<String>,
    ) -> Result<reqwest::Response> {
        let url = self.get_url(path, query_params)?;

        tracing::debug!(%method, %url, "bridge request");

        self.client
            .request(method, url)
            .send()
            .await
            .map_err(RestApiError::SendFailed)
    }

    async fn decode<T>(response: reqwest::Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(RestApiError::ResponseDecoding)?;

            return Err(RestApiError::ErrorResponse { status, text });
        }

        let raw_response = response
            .text()
            .await
            .map_err(RestApiError::ResponseDecoding)?;

        serde_json::from_str::<T>(&raw_response)
            .map_err(|e| RestApiError::ResponseJsonDeserializeFailed { raw_response, e })
    }

    pub async fn make_request<T>(
        &self,
        method: Method,
        path: BridgePath,
        query_params: Option<String>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, query_params).await?;
        Self::decode(response).await
    }

    /// Like [`make_request`](Self::make_request), but maps a `404 Not Found` response to `None`.
    pub async fn make_optional_request<T>(
        &self,
        method: Method,
        path: BridgePath,
        query_params: Option<String>,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, query_params).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Self::decode(response).await.map(Some)
    }

    pub async fn make_request_with_query_params<I, K, V, T>(
        &self,
        method: Method,
        path: BridgePath,
        query_params: I,
    ) -> Result<T>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
        T: DeserializeOwned,
    {
        let query_str = query_params
            .into_iter()
            .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
            .collect::<Vec<String>>()
            .join("&");

        self.make_request(method, path, Some(query_str)).await
    }

    pub async fn make_request_without_params<T>(&self, method: Method, path: BridgePath) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.make_request(method, path, None).await
    }
}
