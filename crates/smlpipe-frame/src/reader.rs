use smlpipe_transport::ByteSource;
use tracing::{debug, trace};

use crate::error::{FrameError, Result};
use crate::frame::RawFrame;
use crate::markers::{find_start, END_PREFIX, MAX_START_ATTEMPTS, START, TRAILER_LEN};

/// Default upper bound for a single read while hunting for a marker: 64 KiB.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Frame reader limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Reads spent looking for the start sequence before `NoStart`.
    pub max_start_attempts: u32,
    /// Maximum bytes consumed by one marker search.
    pub max_frame_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_start_attempts: MAX_START_ATTEMPTS,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Extracts complete SML transport frames from a [`ByteSource`].
///
/// The link may start mid-message or carry noise. The reader gives the
/// start search a bounded number of reads, resynchronizing when a read ran
/// past garbage into a start sequence, and then reads the rest of the
/// frame without a retry budget.
pub struct FrameReader<S> {
    inner: S,
    config: FrameConfig,
}

impl<S: ByteSource> FrameReader<S> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: S, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame (blocking, bounded by source timeouts).
    pub fn next_frame(&mut self) -> Result<RawFrame> {
        let start = self.read_start()?;

        let body = self.inner.read_until(&END_PREFIX, self.config.max_frame_len)?;
        if !body.ends_with(&END_PREFIX) {
            if body.len() >= self.config.max_frame_len {
                return Err(FrameError::Oversized {
                    max: self.config.max_frame_len,
                });
            }
            return Err(FrameError::Incomplete { read: body.len() });
        }

        let trailer = self.inner.read_exact(TRAILER_LEN)?;
        if trailer.len() < TRAILER_LEN {
            return Err(FrameError::Truncated {
                read: trailer.len(),
            });
        }

        let frame = RawFrame::from_parts(&start, &body, &trailer);
        trace!(len = frame.len(), "frame complete");
        Ok(frame)
    }

    /// Hunt for the start sequence. Returns exactly the start sequence.
    fn read_start(&mut self) -> Result<Vec<u8>> {
        for attempt in 1..=self.config.max_start_attempts {
            let read = self.inner.read_until(&START, self.config.max_frame_len)?;

            if read == START {
                return Ok(read);
            }

            // A longer read means we joined mid-stream or timed out after
            // crossing a frame boundary. Keep the start, drop the rest.
            if read.len() > START.len() {
                if let Some(pos) = find_start(&read) {
                    debug!(attempt, discarded = pos, "resynchronized on start sequence");
                    return Ok(read[pos..].to_vec());
                }
                debug!(attempt, len = read.len(), "no start sequence in read");
            } else {
                debug!(attempt, len = read.len(), "read timeout waiting for start sequence");
            }
        }

        Err(FrameError::NoStart {
            attempts: self.config.max_start_attempts,
        })
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
