use std::time::Duration;

use tokio::time;

use super::{
    core::{ChannelId, ChannelVerifier, VerificationOutcome},
    error::VerificationError,
};

/// Runs single verifications, bounded by a timeout.
pub(crate) struct VerificationClient {
    timeout: Duration,
}

impl VerificationClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Performs one check through `verifier`. Never fails; every failure is folded into the
    /// returned outcome.
    pub async fn run(&self, channel: &ChannelId, verifier: &dyn ChannelVerifier) -> VerificationOutcome {
        tracing::debug!(%channel, "verifying channel");

        let res = match time::timeout(self.timeout, verifier.check()).await {
            Ok(res) => res,
            Err(_) => Err(VerificationError::Timeout(self.timeout)),
        };

        let outcome = VerificationOutcome::from(res);

        match &outcome {
            VerificationOutcome::Connected { peer } => {
                tracing::debug!(%channel, ?peer, "channel verified")
            }
            VerificationOutcome::NoPeer => tracing::debug!(%channel, "channel has no peer"),
            VerificationOutcome::Failed(e) => {
                tracing::debug!(%channel, error = %e, "channel verification failed")
            }
        }

        outcome
    }
}
