mod connection;
pub(crate) mod error;
pub(crate) mod models;


pub use connection::{SignalStreamConnection, StreamRead, StreamTarget};
