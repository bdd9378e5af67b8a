use bytes::Bytes;

use crate::markers::{END_PREFIX, MIN_FRAME_LEN, START, TRAILER_LEN};

/// One complete SML transport message, markers and trailer included.
///
/// Always starts with [`START`] and carries [`END_PREFIX`] followed by
/// exactly [`TRAILER_LEN`] bytes at its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Bytes,
}

impl RawFrame {
    /// Wrap bytes that already form a complete frame.
    ///
    /// Returns `None` if the start or end markers are not where a frame
    /// needs them.
    pub fn new(bytes: impl Into<Bytes>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.len() < MIN_FRAME_LEN || !bytes.starts_with(&START) {
            return None;
        }
        let end = bytes.len() - TRAILER_LEN - END_PREFIX.len();
        if bytes[end..end + END_PREFIX.len()] != END_PREFIX {
            return None;
        }
        Some(Self { bytes })
    }

    /// Assemble a frame from what the reader collected. The caller
    /// guarantees the marker layout.
    pub(crate) fn from_parts(start: &[u8], body: &[u8], trailer: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(start.len() + body.len() + trailer.len());
        buf.extend_from_slice(start);
        buf.extend_from_slice(body);
        buf.extend_from_slice(trailer);
        Self {
            bytes: Bytes::from(buf),
        }
    }

    /// The whole frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a frame holds at least its markers.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The SML message list between the start sequence and the end prefix,
    /// padding included.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[START.len()..self.end_prefix_offset()]
    }

    /// Number of 0x00 padding bytes the sender appended to the payload.
    pub fn padding(&self) -> u8 {
        self.bytes[self.bytes.len() - TRAILER_LEN]
    }

    /// The two checksum bytes as transmitted.
    pub fn checksum(&self) -> [u8; 2] {
        let n = self.bytes.len();
        [self.bytes[n - 2], self.bytes[n - 1]]
    }

    /// Consume the frame and return its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    fn end_prefix_offset(&self) -> usize {
        self.bytes.len() - TRAILER_LEN - END_PREFIX.len()
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(body: &[u8], trailer: [u8; 3]) -> Vec<u8> {
        let mut v = START.to_vec();
        v.extend_from_slice(body);
        v.extend_from_slice(&END_PREFIX);
        v.extend_from_slice(&trailer);
        v
    }

    #[test]
    fn accessors_split_frame() {
        let frame = RawFrame::new(wire(&[0x76, 0x05, 0x00, 0x00], [0x02, 0xab, 0xcd])).unwrap();

        assert_eq!(frame.len(), 20);
        assert!(!frame.is_empty());
        assert_eq!(frame.payload(), &[0x76, 0x05, 0x00, 0x00]);
        assert_eq!(frame.padding(), 2);
        assert_eq!(frame.checksum(), [0xab, 0xcd]);
        assert!(frame.as_bytes().starts_with(&START));
    }

    #[test]
    fn new_rejects_missing_markers() {
        assert!(RawFrame::new(vec![0u8; 20]).is_none());
        assert!(RawFrame::new(START.to_vec()).is_none());

        let mut bad_end = wire(b"body", [0, 0, 0]);
        let n = bad_end.len();
        bad_end[n - 4] = 0x1b;
        assert!(RawFrame::new(bad_end).is_none());
    }

    #[test]
    fn empty_body_is_a_valid_frame() {
        let frame = RawFrame::new(wire(&[], [0, 0, 0])).unwrap();
        assert!(frame.payload().is_empty());
        assert_eq!(frame.into_bytes().len(), 16);
    }
}
