//! Subscriber registry for fan-out
//!
//! The registry owns one bounded queue per connected subscriber. Publishing
//! takes a snapshot of the queues and pushes the frame into each of them;
//! every subscriber's send-loop drains its own queue independently.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<SubscriberRegistry>
//!                   ┌──────────────────────────────┐
//!                   │ subscribers: HashMap<Id,     │
//!                   │   Arc<FrameQueue> {          │
//!                   │     frames: VecDeque<Frame>, │
//!                   │     notify,                  │
//!                   │   }                          │
//!                   │ >                            │
//!                   └──────────────┬───────────────┘
//!                                  │
//!        ┌─────────────────────────┼─────────────────────────┐
//!        │                         │                         │
//!        ▼                         ▼                         ▼
//!   [Producer]               [Send-loop]               [Send-loop]
//!   publish()                queue.pop()               queue.pop()
//!        │                         │                         │
//!        └──► registry.fan_out() ──► push() ──► send_frame() ──► TCP
//! ```
//!
//! # Backpressure
//!
//! Queues never block the producer. A queue over its high-water mark drops
//! its oldest frames, so a stalled subscriber only ever holds the latest
//! `high_water_mark + 1` frames and cannot affect anyone else.

pub mod frame;
pub mod queue;
pub mod store;

pub use frame::{Frame, SubscriberId};
pub use queue::FrameQueue;
pub use store::SubscriberRegistry;
