use std::sync::Arc;

use async_trait::async_trait;

use sensoria_bridge::models::{BridgeFrame, NORMAL_CLOSURE};

use crate::stream::{StreamConnector, StreamTransport, TransportEvent};

use super::{
    core::{ChannelVerifier, PeerStatus},
    error::{Result, VerificationError},
};

/// Verifies a channel by subscribing to the signal stream.
///
/// The check succeeds once the bridge sends its initial `connection` frame with status
/// `connected`. The probe connection is then closed with the normal closure code.
pub struct StreamProbeVerifier {
    connector: Arc<dyn StreamConnector>,
}

impl StreamProbeVerifier {
    pub fn new(connector: Arc<dyn StreamConnector>) -> Self {
        Self { connector }
    }

    async fn await_confirmation(transport: &mut dyn StreamTransport) -> Result<PeerStatus> {
        loop {
            match transport.next_event().await? {
                TransportEvent::Text(text) => match text.parse::<BridgeFrame>() {
                    Ok(frame) if frame.is_connection_confirmed() => {
                        return Ok(PeerStatus::Connected { peer: None });
                    }
                    Ok(BridgeFrame::Connection { status, .. }) => {
                        return Err(VerificationError::UnexpectedStatus(
                            status.unwrap_or_else(|| "<none>".to_string()),
                        ));
                    }
                    Ok(frame) => {
                        tracing::debug!(kind = frame.kind(), "probe skipped frame");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "probe received malformed frame");
                    }
                },
                TransportEvent::Malformed(reason) => {
                    tracing::warn!(%reason, "probe received malformed frame");
                }
                TransportEvent::Ping(payload) => transport.send_pong(payload).await?,
                TransportEvent::Pong => {}
                TransportEvent::Closed { code } => {
                    return Err(VerificationError::ProbeClosed(code));
                }
            }
        }
    }
}

#[async_trait]
impl ChannelVerifier for StreamProbeVerifier {
    async fn check(&self) -> Result<PeerStatus> {
        self.connector.validate()?;

        let mut transport = self.connector.connect().await?;

        let res = Self::await_confirmation(transport.as_mut()).await;

        if !matches!(res, Err(VerificationError::ProbeClosed(_))) {
            if let Err(e) = transport.close(NORMAL_CLOSURE).await {
                tracing::debug!(error = %e, "failed to close probe connection");
            }
        }

        res
    }
}
