/// Errors that can occur while decoding a frame.
///
/// All of them are per-frame: the frame is dropped and reading continues.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The bytes end before the SML structure does.
    #[error("incomplete SML message")]
    IncompleteMessage,

    /// The bytes do not form valid SML.
    #[error("malformed SML payload: {0}")]
    MalformedPayload(String),

    /// The transport checksum does not match the frame contents.
    #[error("checksum mismatch (expected {expected:#06x}, got {actual:#06x})")]
    ChecksumMismatch { expected: u16, actual: u16 },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
