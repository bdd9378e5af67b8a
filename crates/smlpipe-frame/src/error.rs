use smlpipe_transport::TransportError;

/// Errors that can occur while extracting a frame.
///
/// Everything except [`FrameError::Transport`] is a per-frame condition:
/// callers log it and go on to the next frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No start sequence was seen within the allowed number of reads.
    #[error("no start sequence after {attempts} read attempts")]
    NoStart { attempts: u32 },

    /// The link timed out before the end sequence arrived.
    #[error("incomplete frame: end sequence missing after {read} bytes")]
    Incomplete { read: usize },

    /// The link timed out inside the 3 trailer bytes.
    #[error("truncated frame: {read} of 3 trailer bytes")]
    Truncated { read: usize },

    /// The end sequence was not found within the configured frame size.
    #[error("frame exceeds {max} bytes without end sequence")]
    Oversized { max: usize },

    /// The underlying byte source failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
