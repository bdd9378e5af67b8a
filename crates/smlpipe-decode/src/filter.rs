use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::obis::ObisCode;
use crate::record::MeasurementRecord;

/// A named, rounded, timestamped reading ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Logical name, e.g. `Verbrauch.total`.
    pub name: String,
    /// Scaled value rounded to one decimal.
    pub value: f64,
    /// Capture time in seconds since the Unix epoch.
    pub timestamp: f64,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64, timestamp: f64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp,
        }
    }
}

/// Selects the codes of interest and names them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementFilter {
    names: BTreeMap<ObisCode, String>,
}

impl Default for MeasurementFilter {
    /// Total import, total export and current power.
    fn default() -> Self {
        Self::new(BTreeMap::from([
            (ObisCode::ENERGY_IMPORT_TOTAL, "Verbrauch.total".to_string()),
            (ObisCode::ENERGY_EXPORT_TOTAL, "Einspeisung.total".to_string()),
            (ObisCode::ACTIVE_POWER, "Wirkleistung.aktuell".to_string()),
        ]))
    }
}

impl MeasurementFilter {
    pub fn new(names: BTreeMap<ObisCode, String>) -> Self {
        Self { names }
    }

    /// Configured code → name mapping.
    pub fn names(&self) -> &BTreeMap<ObisCode, String> {
        &self.names
    }

    /// Name configured for `code`.
    pub fn name_of(&self, code: &ObisCode) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// One metric per record with a configured code, stamped `captured_at`.
    /// Records with other codes are dropped.
    pub fn filter(&self, records: &[MeasurementRecord], captured_at: SystemTime) -> Vec<Metric> {
        let timestamp = unix_seconds(captured_at);
        records
            .iter()
            .filter_map(|record| {
                let name = self.names.get(&record.code)?;
                Some(Metric::new(name.clone(), round1(record.value()), timestamp))
            })
            .collect()
    }

    /// [`filter`](Self::filter) stamped with the current wall-clock time.
    pub fn filter_now(&self, records: &[MeasurementRecord]) -> Vec<Metric> {
        self.filter(records, SystemTime::now())
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn unix_seconds(at: SystemTime) -> f64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn maps_and_scales_configured_codes() {
        let records = vec![
            MeasurementRecord::new(ObisCode::ENERGY_IMPORT_TOTAL, 12345, -1, Some(30)),
            MeasurementRecord::new(ObisCode::ENERGY_EXPORT_TOTAL, 200, 0, Some(30)),
        ];
        let metrics = MeasurementFilter::default().filter(&records, at(1_700_000_000));

        assert_eq!(
            metrics,
            vec![
                Metric::new("Verbrauch.total", 1234.5, 1_700_000_000.0),
                Metric::new("Einspeisung.total", 200.0, 1_700_000_000.0),
            ]
        );
    }

    #[test]
    fn unknown_codes_are_skipped() {
        let records = vec![
            MeasurementRecord::new(ObisCode([1, 0, 0x24, 7, 0, 0xff]), 5, 0, Some(27)),
            MeasurementRecord::new(ObisCode::ACTIVE_POWER, 4321, -2, Some(27)),
        ];
        let metrics = MeasurementFilter::default().filter(&records, at(10));

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name, "Wirkleistung.aktuell");
        assert_eq!(metrics[0].value, 43.2);
    }

    #[test]
    fn custom_map_replaces_defaults() {
        let filter = MeasurementFilter::new(BTreeMap::from([(
            ObisCode::ENERGY_IMPORT_TOTAL,
            "Import".to_string(),
        )]));
        assert_eq!(filter.name_of(&ObisCode::ENERGY_IMPORT_TOTAL), Some("Import"));
        assert_eq!(filter.name_of(&ObisCode::ACTIVE_POWER), None);

        let records = vec![MeasurementRecord::new(ObisCode::ACTIVE_POWER, 1, 0, None)];
        assert!(filter.filter(&records, at(0)).is_empty());
    }

    #[test]
    fn value_matches_rounded_scaled_mantissa() {
        let cases: &[(i64, i8)] = &[
            (12345, -1),
            (200, 0),
            (-987654, -3),
            (1, 3),
            (123456789, -4),
            (15, -2),
            (0, -5),
        ];
        let filter = MeasurementFilter::new(BTreeMap::from([(ObisCode::ACTIVE_POWER, "p".to_string())]));
        for &(mantissa, scale) in cases {
            let record = MeasurementRecord::new(ObisCode::ACTIVE_POWER, mantissa, scale, None);
            let metric = &filter.filter(&[record.clone()], at(0))[0];
            let expected = (mantissa as f64 * 10f64.powi(i32::from(scale)) * 10.0).round() / 10.0;
            assert_eq!(metric.value, expected, "mantissa={mantissa} scale={scale}");
        }
    }

    #[test]
    fn round1_examples() {
        assert_eq!(round1(1234.5), 1234.5);
        assert_eq!(round1(0.25), 0.3);
        assert_eq!(round1(-2.25), -2.3);
        assert_eq!(round1(987.654), 987.7);
    }

    #[test]
    fn filter_now_stamps_current_time() {
        let records = vec![MeasurementRecord::new(ObisCode::ENERGY_IMPORT_TOTAL, 1, 0, None)];
        let before = unix_seconds(SystemTime::now());
        let metrics = MeasurementFilter::default().filter_now(&records);
        assert!(metrics[0].timestamp >= before);
    }

    #[test]
    fn filter_deserializes_from_toml_map() {
        #[derive(Deserialize)]
        struct Cfg {
            obis: BTreeMap<ObisCode, String>,
        }
        let cfg: Cfg = toml::from_str("[obis]\n\"0100010800ff\" = \"Verbrauch.total\"\n").unwrap();
        let filter = MeasurementFilter::new(cfg.obis);
        assert_eq!(filter.names().len(), 1);
        assert_eq!(filter.name_of(&ObisCode::ENERGY_IMPORT_TOTAL), Some("Verbrauch.total"));
    }
}
