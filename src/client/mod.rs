//! Subscriber client
//!
//! Provides the receiving side of a broadcast for:
//! - Consuming a broadcaster from another process
//! - Integration tests and demos

pub mod subscriber;

pub use subscriber::FrameSubscriber;
