//! Broadcast server
//!
//! Accepts subscriber connections and runs one send-loop per subscriber on
//! whatever runtime drives [`FrameServer::run_until`]. The
//! [`Broadcaster`](crate::Broadcaster) runs it on its own I/O thread.

pub mod config;
pub mod connection;
pub mod endpoint;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_ENDPOINT};
pub use connection::{CloseReason, SubscriberConnection, SubscriberPhase};
pub use endpoint::{Endpoint, Scheme};
pub use listener::FrameServer;
