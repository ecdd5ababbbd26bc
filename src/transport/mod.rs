//! Wire transport for subscriber connections
//!
//! The send-loop only needs something that can write one frame atomically:
//! metadata first, then payload, with nothing else on the connection in
//! between. [`FrameSink`] is that seam; [`FrameWriter`] implements it over
//! any `AsyncWrite` with length-prefixed framing. Other transports (e.g.
//! WebSocket messages) plug in by implementing the trait.

use std::future::Future;
use std::io;

use crate::registry::Frame;

pub mod codec;

pub use codec::{FrameReader, FrameWriter, DEFAULT_MAX_FRAME_SIZE, LEN_PREFIX_SIZE};

/// Destination for frames on a single subscriber connection
///
/// A sink is owned by exactly one send-loop, so a call to `send_frame` is
/// never interleaved with another frame on the same connection.
pub trait FrameSink: Send {
    /// Write the metadata part then the payload part of `frame`
    fn send_frame(&mut self, frame: &Frame) -> impl Future<Output = io::Result<()>> + Send;
}
