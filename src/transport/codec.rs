//! Length-prefixed framing for byte streams
//!
//! Each part is written as a 4-byte big-endian length followed by the bytes.
//! A message is two parts back to back:
//!
//! ```text
//! +--------+-----------------+--------+-----------------+
//! | len(4) | metadata        | len(4) | payload         |
//! +--------+-----------------+--------+-----------------+
//! ```

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::FrameSink;
use crate::registry::Frame;

/// Size of the length prefix in bytes
pub const LEN_PREFIX_SIZE: usize = 4;

/// Default largest part a [`FrameReader`] accepts (16 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Writes frames to an `AsyncWrite` using length-prefixed framing
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the underlying writer
    pub fn into_inner(self) -> W {
        self.inner
    }

    async fn write_part(&mut self, part: &[u8]) -> io::Result<()> {
        let len = u32::try_from(part.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "frame part exceeds u32::MAX bytes")
        })?;
        self.inner.write_all(&len.to_be_bytes()).await?;
        self.inner.write_all(part).await
    }
}

impl<W> FrameSink for FrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.write_part(frame.metadata()).await?;
        self.write_part(frame.payload()).await?;
        self.inner.flush().await
    }
}

/// Reads frames written by a [`FrameWriter`]
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    max_frame_size: usize,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap a reader with the default size limit
    pub fn new(inner: R) -> Self {
        Self::with_max_frame_size(inner, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Wrap a reader, refusing parts longer than `max_frame_size`
    pub fn with_max_frame_size(inner: R, max_frame_size: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(8 * 1024),
            max_frame_size,
        }
    }

    /// Read the next (metadata, payload) pair
    ///
    /// Returns `Ok(None)` if the stream ended cleanly between messages.
    pub async fn read_frame(&mut self) -> io::Result<Option<Frame>> {
        let metadata = match self.read_part().await? {
            Some(metadata) => metadata,
            None => return Ok(None),
        };

        let payload = self.read_part().await?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended between metadata and payload",
            )
        })?;

        Ok(Some(Frame::new(metadata, payload)))
    }

    async fn read_part(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            if let Some(part) = self.parse_part()? {
                return Ok(Some(part));
            }

            if self.inner.read_buf(&mut self.buf).await? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended mid-frame",
                ));
            }
        }
    }

    fn parse_part(&mut self) -> io::Result<Option<Bytes>> {
        if self.buf.len() < LEN_PREFIX_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if len > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame part of {len} bytes exceeds limit of {}", self.max_frame_size),
            ));
        }

        let needed = LEN_PREFIX_SIZE + len;
        if self.buf.len() < needed {
            self.buf.reserve(needed - self.buf.len());
            return Ok(None);
        }

        self.buf.advance(LEN_PREFIX_SIZE);
        Ok(Some(self.buf.split_to(len).freeze()))
    }
}
