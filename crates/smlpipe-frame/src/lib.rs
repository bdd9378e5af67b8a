//! SML transport frame extraction.
//!
//! Meters emit SML transport messages delimited by escape sequences:
//! - An 8-byte start sequence (`1b1b1b1b 01010101`)
//! - The SML message list
//! - A 5-byte end prefix (`1b1b1b1b 1a`), one padding-count byte and a
//!   2-byte checksum
//!
//! The reader resynchronizes when the link starts mid-message and hands
//! out complete frames only. Checksum verification is left to the decoder.

pub mod error;
pub mod frame;
pub mod markers;
pub mod reader;

pub use error::{FrameError, Result};
pub use frame::RawFrame;
pub use markers::{END_PREFIX, ESCAPE, MAX_START_ATTEMPTS, START, TRAILER_LEN};
pub use reader::{FrameConfig, FrameReader, DEFAULT_MAX_FRAME_LEN};
