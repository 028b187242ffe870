use std::sync::Arc;

use async_trait::async_trait;

use sensoria_bridge::RestClient;

use super::{
    core::{ChannelVerifier, PeerStatus},
    error::Result,
};

/// Verifies a channel by calling the bridge's verification endpoint.
pub struct HttpVerifier {
    client: Arc<RestClient>,
}

impl HttpVerifier {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelVerifier for HttpVerifier {
    async fn check(&self) -> Result<PeerStatus> {
        let res = self.client.verify_connection().await?;

        if !res.connected() {
            return Ok(PeerStatus::NoPeer);
        }

        Ok(PeerStatus::Connected {
            peer: res.client_address().map(str::to_string),
        })
    }
}
