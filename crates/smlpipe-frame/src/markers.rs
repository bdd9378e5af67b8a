//! SML transport escape sequences.
//!
//! A frame on the wire:
//! ```text
//! ┌──────────────────────┬──────────────┬──────────────────┬─────────┬───────────┐
//! │ 1b1b1b1b 01010101    │ SML messages │ 1b1b1b1b 1a      │ padding │ CRC16     │
//! │ START (8B)           │ (variable)   │ END_PREFIX (5B)  │ (1B)    │ (2B)      │
//! └──────────────────────┴──────────────┴──────────────────┴─────────┴───────────┘
//! ```

/// Escape byte repeated four times in every marker.
pub const ESCAPE: [u8; 4] = [0x1b; 4];

/// Start of an SML transport message.
pub const START: [u8; 8] = [0x1b, 0x1b, 0x1b, 0x1b, 0x01, 0x01, 0x01, 0x01];

/// End of the message body; followed by [`TRAILER_LEN`] more bytes.
pub const END_PREFIX: [u8; 5] = [0x1b, 0x1b, 0x1b, 0x1b, 0x1a];

/// Padding-count byte plus 2 checksum bytes after [`END_PREFIX`].
pub const TRAILER_LEN: usize = 3;

/// Reads spent looking for [`START`] before giving up on a frame.
pub const MAX_START_ATTEMPTS: u32 = 5;

/// Shortest possible frame: start, end prefix and trailer with no body.
pub const MIN_FRAME_LEN: usize = START.len() + END_PREFIX.len() + TRAILER_LEN;

/// Returns the offset of the first [`START`] in `data`.
pub fn find_start(data: &[u8]) -> Option<usize> {
    data.windows(START.len()).position(|w| w == START)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_share_escape_prefix() {
        assert!(START.starts_with(&ESCAPE));
        assert!(END_PREFIX.starts_with(&ESCAPE));
        assert_eq!(MIN_FRAME_LEN, 16);
    }

    #[test]
    fn find_start_locates_first_occurrence() {
        let mut data = vec![0xaa; 5];
        data.extend_from_slice(&START);
        data.extend_from_slice(&START);
        assert_eq!(find_start(&data), Some(5));
        assert_eq!(find_start(&data[..10]), None);
    }
}
