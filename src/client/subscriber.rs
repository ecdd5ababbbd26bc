//! Broadcast subscriber client
//!
//! Connects to a running broadcaster and reads (metadata, payload) frames.

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;
use crate::registry::Frame;
use crate::transport::{FrameReader, DEFAULT_MAX_FRAME_SIZE};

/// TCP subscriber
///
/// # Example
/// ```no_run
/// use framecast::client::FrameSubscriber;
///
/// # async fn example() -> framecast::Result<()> {
/// let mut subscriber = FrameSubscriber::connect("127.0.0.1:5556").await?;
///
/// while let Some(frame) = subscriber.next_frame().await? {
///     println!("{} metadata bytes, {} payload bytes",
///         frame.metadata().len(), frame.payload().len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FrameSubscriber {
    reader: FrameReader<TcpStream>,
}

impl FrameSubscriber {
    /// Connect with the default frame size limit
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        Self::connect_with_max_frame_size(addr, DEFAULT_MAX_FRAME_SIZE).await
    }

    /// Connect, refusing frame parts larger than `max_frame_size`
    pub async fn connect_with_max_frame_size<A: ToSocketAddrs>(
        addr: A,
        max_frame_size: usize,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: FrameReader::with_max_frame_size(stream, max_frame_size),
        })
    }

    /// Wait for the next frame
    ///
    /// Returns `Ok(None)` when the broadcaster closes the connection.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.reader.read_frame().await?)
    }
}
