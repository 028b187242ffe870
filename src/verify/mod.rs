mod client;
mod core;
pub(crate) mod error;
mod http;
mod probe;
mod state;

#[cfg(test)]
pub(crate) mod fakes;

pub(crate) use client::VerificationClient;
pub use core::{ChannelId, ChannelVerifier, PeerStatus, VerificationOutcome};
pub use http::HttpVerifier;
pub use probe::StreamProbeVerifier;
pub use state::ConnectionState;
