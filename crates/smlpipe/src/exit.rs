use std::fmt;

use smlpipe_delivery::DeliveryError;
use smlpipe_frame::FrameError;
use smlpipe_transport::TransportError;

use crate::config::ConfigError;

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DEVICE_OPEN_FAILED: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

// Operator-facing error tags printed with fatal errors.
pub const ERR_DEVICE: &str = "ERR_DEVICE";
pub const ERR_MESG: &str = "ERR_MESG";
pub const ERR_CONFIG: &str = "ERR_CONFIG";
pub const ERR_INTERNAL: &str = "ERR_INTERNAL";

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub tag: &'static str,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, tag: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            tag,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL, ERR_INTERNAL, message)
    }

    /// `2024-05-01 12:00:00.123456 ERR_DEVICE: <message>`
    pub fn fatal_line(&self, now: chrono::DateTime<chrono::Local>) -> String {
        format!(
            "{} {}: {}",
            now.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.tag,
            self.message
        )
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { .. }
        | TransportError::Configure { .. }
        | TransportError::UnsupportedBaud(_) => {
            CliError::new(DEVICE_OPEN_FAILED, ERR_DEVICE, format!("{context}: {err}"))
        }
        TransportError::Io(_) => CliError::new(FAILURE, ERR_DEVICE, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        other => CliError::new(FAILURE, ERR_MESG, format!("{context}: {other}")),
    }
}

pub fn config_error(err: ConfigError) -> CliError {
    CliError::new(DATA_INVALID, ERR_CONFIG, err.to_string())
}

pub fn delivery_error(context: &str, err: DeliveryError) -> CliError {
    match err {
        DeliveryError::Setup(_) => CliError::new(DATA_INVALID, ERR_CONFIG, format!("{context}: {err}")),
        other => CliError::internal(format!("{context}: {other}")),
    }
}
