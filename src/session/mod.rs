mod config;
mod coordinator;
pub(crate) mod error;
mod state;


pub use config::SessionConfig;
pub use coordinator::{SessionCoordinator, SessionCoordinatorBuilder};
pub use state::{
    ChannelSnapshot, SessionReader, SessionReceiver, SessionSnapshot, SessionStatus,
    SessionUpdate,
};
