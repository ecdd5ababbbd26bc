//! Frame and subscriber identifier types
//!
//! A [`Frame`] is the unit fanned out to subscribers: a metadata blob and a
//! payload blob that always travel together, metadata first.

use bytes::Bytes;

/// Unique identifier for one subscriber connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Wrap a raw id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A message ready to be broadcast to subscribers
///
/// Cheap to clone: both halves are `Bytes`, so every subscriber queue shares
/// the same allocation and nothing is copied per subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    metadata: Bytes,
    payload: Bytes,
}

impl Frame {
    /// Create a frame from a metadata part and a payload part
    pub fn new(metadata: impl Into<Bytes>, payload: impl Into<Bytes>) -> Self {
        Self {
            metadata: metadata.into(),
            payload: payload.into(),
        }
    }

    /// Serialized metadata (written first)
    pub fn metadata(&self) -> &Bytes {
        &self.metadata
    }

    /// Payload (written second)
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Total number of bytes carried, excluding transport framing
    pub fn len(&self) -> usize {
        self.metadata.len() + self.payload.len()
    }

    /// True if both parts are empty
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.payload.is_empty()
    }

    /// Split into `(metadata, payload)`
    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.metadata, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_allocation() {
        let frame = Frame::new(Bytes::from_static(b"{\"seq\":1}"), vec![0u8; 1024]);
        let copy = frame.clone();

        assert_eq!(frame.payload().as_ptr(), copy.payload().as_ptr());
        assert_eq!(frame.metadata().as_ptr(), copy.metadata().as_ptr());
    }

    #[test]
    fn test_len() {
        let frame = Frame::new("meta", "data!");
        assert_eq!(frame.len(), 9);
        assert!(!frame.is_empty());
        assert!(Frame::new(Bytes::new(), Bytes::new()).is_empty());

        let (meta, payload) = frame.into_parts();
        assert_eq!(&meta[..], b"meta");
        assert_eq!(&payload[..], b"data!");
    }

    #[test]
    fn test_subscriber_id_display() {
        assert_eq!(SubscriberId::new(7).to_string(), "sub-7");
        assert_eq!(SubscriberId::new(7).as_u64(), 7);
    }
}
