use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::Deserialize;
use smlpipe_decode::Metric;
use tracing::debug;

use crate::error::SinkError;
use crate::sink::Sink;

/// Carbon plaintext endpoint settings for [`GraphiteSink`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GraphiteConfig {
    pub host: String,
    pub port: u16,
    /// Path prefix; `Strom` turns `Verbrauch.total` into
    /// `Strom.Verbrauch.total`. Empty means no prefix.
    pub prefix: String,
    /// Connect and write timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for GraphiteConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2003,
            prefix: "Strom".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// Delivers metrics over the Carbon plaintext protocol.
///
/// The TCP connection is opened on first use and kept. Any I/O error drops
/// it so the next delivery reconnects.
#[derive(Debug)]
pub struct GraphiteSink {
    config: GraphiteConfig,
    stream: Option<TcpStream>,
}

impl GraphiteSink {
    pub fn new(config: GraphiteConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn config(&self) -> &GraphiteConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// `<path> <value> <unix seconds>\n`, seconds rounded to an integer.
    pub fn line(&self, metric: &Metric) -> String {
        let path = if self.config.prefix.is_empty() {
            metric.name.clone()
        } else {
            format!("{}.{}", self.config.prefix, metric.name)
        };
        format!(
            "{path} {} {}\n",
            metric.value,
            metric.timestamp.round() as i64
        )
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let mut last_err = None;
        for addr in (self.config.host.as_str(), self.config.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_nodelay(true)?;
                    debug!(%addr, "connected to graphite");
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} resolved to no address", self.config.host),
            )
        }))
    }
}

impl Sink for GraphiteSink {
    fn name(&self) -> &str {
        "graphite"
    }

    fn deliver(&mut self, metric: &Metric) -> Result<(), SinkError> {
        let line = self.line(metric);

        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.connect().map_err(classify)?,
        };

        // On error the stream is dropped here and the next call reconnects.
        stream
            .write_all(line.as_bytes())
            .and_then(|()| stream.flush())
            .map_err(classify)?;
        self.stream = Some(stream);
        Ok(())
    }
}

fn classify(err: io::Error) -> SinkError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => SinkError::Timeout,
        _ => SinkError::ConnectionFailed(err.to_string()),
    }
}
