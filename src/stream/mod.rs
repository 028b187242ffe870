pub(crate) mod config;
pub(crate) mod error;
mod machine;
mod models;
mod process;
mod supervisor;
mod transport;

#[cfg(test)]
pub(crate) mod fakes;
#[cfg(test)]
mod tests;

pub use config::ReconnectPolicy;
pub(crate) use config::StreamSupervisorConfig;
pub use machine::{StreamEffect, StreamEvent, StreamMachine, StreamPhase};
pub use models::{MotorImagery, SignalReading};
pub(crate) use process::{StreamNotice, StreamNoticeKind};
pub(crate) use supervisor::StreamSupervisor;
pub use transport::{BridgeStreamConnector, StreamConnector, StreamTransport, TransportEvent};
