//! # framecast
//!
//! Broadcast fan-out server with per-subscriber backpressure.
//!
//! A producer publishes `(metadata, payload)` messages; every currently
//! connected subscriber receives them through its own bounded queue. When a
//! subscriber falls behind, its queue drops the *oldest* frames so it always
//! holds at most `high_water_mark + 1` of the latest messages. Slow or stalled
//! subscribers never block the producer or each other.
//!
//! ## Architecture
//! ```text
//!   Producer(s)                                   Subscribers
//!       │                                              ▲
//!       ▼                                              │ metadata, payload
//!  Broadcaster::publish ──► SubscriberRegistry         │ (two frames, in order)
//!                             │ snapshot()             │
//!                             ├──► FrameQueue S1 ──► send-loop S1
//!                             ├──► FrameQueue S2 ──► send-loop S2
//!                             └──► FrameQueue SN ──► send-loop SN
//!                                  (drop-oldest)     (framecast-io thread)
//! ```
//!
//! Delivery is at-most-once and latest-wins: no replay for late joiners, no
//! acknowledgements, no persistence.
//!
//! ## Example
//! ```no_run
//! use framecast::{Broadcaster, ServerConfig};
//!
//! # fn main() -> framecast::Result<()> {
//! let broadcaster = Broadcaster::new(
//!     ServerConfig::with_endpoint("tcp://127.0.0.1:5556").high_water_mark(4),
//! )?;
//!
//! for seq in 0..10u32 {
//!     let metadata = format!(r#"{{"seq":{seq}}}"#);
//!     broadcaster.publish(metadata, seq.to_be_bytes().to_vec())?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod broadcaster;
pub mod client;
pub mod error;
pub mod registry;
pub mod server;
pub mod stats;
pub mod transport;

pub use broadcaster::Broadcaster;
pub use error::{Error, Result};
pub use registry::{Frame, FrameQueue, SubscriberId, SubscriberRegistry};
pub use server::{Endpoint, FrameServer, ServerConfig};
pub use stats::StatsSnapshot;
