//! InfluxDB v2 writer.
//!
//! A metric named `Verbrauch.total` becomes one line-protocol point:
//!
//! ```text
//! Strom,Wert=Verbrauch total=1234.5 1700000000000000000
//! ```
//!
//! The name is split at its last `.` into a tag value and a field key. The
//! measurement and the tag key come from [`InfluxConfig`].

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::Deserialize;
use smlpipe_decode::Metric;

use crate::error::{DeliveryError, Result, SinkError};
use crate::sink::Sink;

/// Connection and naming settings for [`InfluxSink`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    /// Server base URL, e.g. `http://localhost:8086`.
    pub url: String,
    pub org: String,
    pub bucket: String,
    /// API token sent as `Authorization: Token ..`. Empty means no header.
    pub token: String,
    pub measurement: String,
    pub tag_key: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            org: String::new(),
            bucket: String::new(),
            token: String::new(),
            measurement: "Strom".to_string(),
            tag_key: "Wert".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl InfluxConfig {
    /// Full write endpoint including the query string.
    pub fn write_url(&self) -> Result<Url> {
        let base = format!("{}/api/v2/write", self.url.trim_end_matches('/'));
        let mut url = Url::parse(&base)
            .map_err(|err| DeliveryError::Setup(format!("invalid influx url {:?}: {err}", self.url)))?;
        url.query_pairs_mut()
            .append_pair("org", &self.org)
            .append_pair("bucket", &self.bucket)
            .append_pair("precision", "ns");
        Ok(url)
    }
}

/// Delivers metrics to an InfluxDB v2 bucket over HTTP.
pub struct InfluxSink {
    config: InfluxConfig,
    client: Client,
    write_url: Url,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Result<Self> {
        let write_url = config.write_url()?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| DeliveryError::Setup(format!("building http client: {err}")))?;
        Ok(Self {
            config,
            client,
            write_url,
        })
    }

    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    /// Line-protocol text for one metric.
    pub fn line(&self, metric: &Metric) -> String {
        let (tag, field) = split_name(&metric.name);
        format!(
            "{},{}={} {}={} {}",
            escape_measurement(&self.config.measurement),
            escape_key(&self.config.tag_key),
            escape_key(tag),
            escape_key(field),
            metric.value,
            timestamp_ns(metric.timestamp),
        )
    }
}

impl Sink for InfluxSink {
    fn name(&self) -> &str {
        "influx"
    }

    fn deliver(&mut self, metric: &Metric) -> std::result::Result<(), SinkError> {
        let mut request = self
            .client
            .post(self.write_url.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(self.line(metric));
        if !self.config.token.is_empty() {
            request = request.header(AUTHORIZATION, format!("Token {}", self.config.token));
        }

        let response = request.send().map_err(classify)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().unwrap_or_default();
        Err(SinkError::WriteRejected(format!(
            "{status}: {}",
            detail.trim()
        )))
    }
}

/// `Verbrauch.total` → (`Verbrauch`, `total`); a name without a dot is
/// written under the field key `value`.
fn split_name(name: &str) -> (&str, &str) {
    name.rsplit_once('.').unwrap_or((name, "value"))
}

fn timestamp_ns(seconds: f64) -> i64 {
    (seconds * 1_000_000_000.0).round() as i64
}

fn classify(err: reqwest::Error) -> SinkError {
    if err.is_timeout() {
        SinkError::Timeout
    } else {
        SinkError::ConnectionFailed(err.to_string())
    }
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag keys, tag values and field keys share the same escaping.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}
