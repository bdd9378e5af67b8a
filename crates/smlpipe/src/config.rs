//! `smlpipe run` configuration file.
//!
//! ```toml
//! device = "/dev/ttyUSB0"
//! baud = 9600
//! timeout_ms = 3000
//! verify_crc = true
//!
//! [obis]
//! "0100010800ff" = "Verbrauch.total"
//!
//! [delivery]
//! idle_ms = 1000
//! backoff_ms = 2000
//!
//! [sinks.influx]
//! url = "http://localhost:8086"
//! org = "home"
//! bucket = "Energie"
//! token = "..."
//!
//! [sinks.graphite]
//! enabled = false
//! host = "localhost"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use smlpipe_decode::{MeasurementFilter, ObisCode};
use smlpipe_delivery::{GraphiteConfig, InfluxConfig, WorkerConfig};
use smlpipe_transport::SerialConfig;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Meter serial device.
    #[serde(default = "default_device")]
    pub device: PathBuf,

    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Read timeout on the serial link.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_true")]
    pub verify_crc: bool,

    /// OBIS code to metric name. Absent means the stock map.
    #[serde(default)]
    pub obis: Option<BTreeMap<ObisCode, String>>,

    #[serde(default)]
    pub delivery: DeliverySection,

    #[serde(default)]
    pub sinks: SinksSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliverySection {
    #[serde(default = "default_idle_ms")]
    pub idle_ms: u64,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            idle_ms: default_idle_ms(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinksSection {
    pub influx: Option<InfluxSection>,
    pub graphite: Option<GraphiteSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfluxSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub client: InfluxConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphiteSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub client: GraphiteConfig,
}

fn default_device() -> PathBuf {
    PathBuf::from("/dev/ttyUSB0")
}

fn default_baud() -> u32 {
    9600
}

fn default_timeout_ms() -> u64 {
    3_000
}

fn default_true() -> bool {
    true
}

fn default_idle_ms() -> u64 {
    1_000
}

fn default_backoff_ms() -> u64 {
    2_000
}

impl AppConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud == 0 {
            return Err(ConfigError::Invalid("baud must be positive".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be positive".into()));
        }
        if let Some(obis) = &self.obis {
            if obis.is_empty() {
                return Err(ConfigError::Invalid("[obis] maps no codes".into()));
            }
            if let Some((code, _)) = obis.iter().find(|(_, name)| name.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("empty metric name for {code}")));
            }
        }

        if let Some(influx) = self.influx() {
            if influx.url.is_empty() || influx.bucket.is_empty() {
                return Err(ConfigError::Invalid(
                    "[sinks.influx] needs url and bucket".into(),
                ));
            }
        }
        if let Some(graphite) = self.graphite() {
            if graphite.host.is_empty() || graphite.port == 0 {
                return Err(ConfigError::Invalid(
                    "[sinks.graphite] needs host and port".into(),
                ));
            }
        }
        if self.influx().is_none() && self.graphite().is_none() {
            return Err(ConfigError::Invalid("no sink enabled".into()));
        }
        Ok(())
    }

    /// Influx settings if that sink is enabled.
    pub fn influx(&self) -> Option<&InfluxConfig> {
        self.sinks
            .influx
            .as_ref()
            .filter(|s| s.enabled)
            .map(|s| &s.client)
    }

    /// Graphite settings if that sink is enabled.
    pub fn graphite(&self) -> Option<&GraphiteConfig> {
        self.sinks
            .graphite
            .as_ref()
            .filter(|s| s.enabled)
            .map(|s| &s.client)
    }

    pub fn filter(&self) -> MeasurementFilter {
        match &self.obis {
            Some(names) => MeasurementFilter::new(names.clone()),
            None => MeasurementFilter::default(),
        }
    }

    pub fn serial(&self) -> SerialConfig {
        SerialConfig {
            baud: self.baud,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    pub fn worker(&self) -> WorkerConfig {
        WorkerConfig {
            idle_interval: Duration::from_millis(self.delivery.idle_ms),
            backoff_interval: Duration::from_millis(self.delivery.backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
device = "/dev/ttyAMA0"
baud = 9600
timeout_ms = 2500
verify_crc = false

[obis]
"0100010800ff" = "Verbrauch.total"
"0100100700ff" = "Wirkleistung.aktuell"

[delivery]
backoff_ms = 500

[sinks.influx]
url = "http://db:8086"
org = "home"
bucket = "Energie"
token = "t0k"

[sinks.graphite]
enabled = false
host = "oel.localdomain"
"#;

    #[test]
    fn parses_full_file() {
        let config = AppConfig::parse(FULL).unwrap();
        assert_eq!(config.device, PathBuf::from("/dev/ttyAMA0"));
        assert!(!config.verify_crc);
        assert_eq!(config.serial().timeout, Duration::from_millis(2500));
        assert_eq!(config.worker().idle_interval, Duration::from_secs(1));
        assert_eq!(config.worker().backoff_interval, Duration::from_millis(500));

        let influx = config.influx().unwrap();
        assert_eq!(influx.bucket, "Energie");
        assert_eq!(influx.measurement, "Strom");
        assert_eq!(influx.tag_key, "Wert");
        assert!(config.graphite().is_none());

        let filter = config.filter();
        assert_eq!(filter.names().len(), 2);
        assert_eq!(filter.name_of(&ObisCode::ENERGY_EXPORT_TOTAL), None);
    }

    #[test]
    fn missing_obis_uses_stock_map() {
        let config = AppConfig::parse("[sinks.graphite]\nhost = \"carbon\"\n").unwrap();
        assert_eq!(config.filter(), MeasurementFilter::default());
        assert_eq!(config.device, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(config.baud, 9600);
        assert_eq!(config.graphite().unwrap().port, 2003);
    }

    #[test]
    fn requires_an_enabled_sink() {
        let err = AppConfig::parse("device = \"/dev/ttyUSB0\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg == "no sink enabled"));

        let err = AppConfig::parse("[sinks.influx]\nenabled = false\nbucket = \"b\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn influx_needs_bucket() {
        let err = AppConfig::parse("[sinks.influx]\nurl = \"http://db\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_obis_key() {
        let err = AppConfig::parse("[obis]\n\"1.8.0\" = \"x\"\n[sinks.graphite]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let err = AppConfig::parse("devcie = \"/dev/x\"\n[sinks.graphite]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/smlpipe.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
