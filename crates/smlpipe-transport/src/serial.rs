use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::StreamSource;

/// Line settings for a meter's optical or wired serial interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line speed. SML meters talk 9600 baud 8N1.
    pub baud: u32,
    /// How long a single read may wait for the next byte.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud: 9600,
            timeout: Duration::from_secs(3),
        }
    }
}

/// A serial device opened 8N1 without flow control.
pub struct SerialPort {
    port: Box<dyn serialport::SerialPort>,
    path: PathBuf,
    config: SerialConfig,
}

impl SerialPort {
    /// Open and configure a serial device.
    pub fn open(path: impl AsRef<Path>, config: SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if config.baud == 0 {
            return Err(TransportError::UnsupportedBaud(config.baud));
        }

        let port = serialport::new(path.to_string_lossy(), config.baud)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|err| open_error(&path, config.baud, err))?;

        // Bytes buffered before the open are noise for the frame reader.
        if let Err(err) = port.clear(ClearBuffer::Input) {
            debug!(?path, "clearing input buffer failed: {err}");
        }

        info!(?path, baud = config.baud, "opened serial device");

        Ok(Self { port, path, config })
    }

    /// Wrap the port as a byte source whose calls are bounded by the read
    /// timeout as a whole, not per read.
    pub fn into_source(self) -> StreamSource<SerialPort> {
        let timeout = self.config.timeout;
        StreamSource::with_read_timeout(self, timeout, SerialPort::set_read_timeout)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(io::Error::from)
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("baud", &self.config.baud)
            .finish()
    }
}

/// Failures of the open call itself are `Open`; a device that exists but
/// refuses the line settings is `Configure`.
fn open_error(path: &Path, baud: u32, err: serialport::Error) -> TransportError {
    match err.kind() {
        serialport::ErrorKind::NoDevice | serialport::ErrorKind::Io(_) => TransportError::Open {
            path: path.to_path_buf(),
            source: err.into(),
        },
        serialport::ErrorKind::InvalidInput => TransportError::UnsupportedBaud(baud),
        _ => TransportError::Configure {
            path: path.to_path_buf(),
            source: err.into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_meter_link() {
        let config = SerialConfig::default();
        assert_eq!(config.baud, 9600);
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn open_missing_device_fails() {
        let result = SerialPort::open("/dev/smlpipe-does-not-exist", SerialConfig::default());
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }

    #[test]
    fn open_rejects_zero_baud() {
        let config = SerialConfig {
            baud: 0,
            ..SerialConfig::default()
        };
        let result = SerialPort::open("/dev/smlpipe-does-not-exist", config);
        assert!(matches!(result, Err(TransportError::UnsupportedBaud(0))));
    }

    #[cfg(unix)]
    #[test]
    fn open_non_tty_fails_to_configure() {
        let result = SerialPort::open("/dev/null", SerialConfig::default());
        assert!(matches!(result, Err(TransportError::Configure { .. })));
    }

    #[test]
    fn error_kinds_map_to_transport_errors() {
        let path = Path::new("/dev/ttyUSB9");
        let err = |kind| serialport::Error::new(kind, "test");

        assert!(matches!(
            open_error(path, 9600, err(serialport::ErrorKind::NoDevice)),
            TransportError::Open { .. }
        ));
        assert!(matches!(
            open_error(path, 9600, err(serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied))),
            TransportError::Open { source, .. } if source.kind() == io::ErrorKind::PermissionDenied
        ));
        assert!(matches!(
            open_error(path, 12345, err(serialport::ErrorKind::InvalidInput)),
            TransportError::UnsupportedBaud(12345)
        ));
        assert!(matches!(
            open_error(path, 9600, err(serialport::ErrorKind::Unknown)),
            TransportError::Configure { path, .. } if path == Path::new("/dev/ttyUSB9")
        ));
    }
}
