use serde::Serialize;

use crate::obis::ObisCode;
use crate::units;

/// One decoded reading: `value = mantissa × 10^scale` in `unit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasurementRecord {
    pub code: ObisCode,
    pub mantissa: i64,
    pub scale: i8,
    pub unit: Option<u8>,
}

impl MeasurementRecord {
    pub fn new(code: ObisCode, mantissa: i64, scale: i8, unit: Option<u8>) -> Self {
        Self {
            code,
            mantissa,
            scale,
            unit,
        }
    }

    /// The scaled reading.
    pub fn value(&self) -> f64 {
        self.mantissa as f64 * 10f64.powi(i32::from(self.scale))
    }

    /// Unit symbol, empty when the meter sent none or an unknown code.
    pub fn unit_symbol(&self) -> &'static str {
        self.unit.and_then(units::symbol).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_applies_scale() {
        let r = MeasurementRecord::new(ObisCode::ENERGY_IMPORT_TOTAL, 12345, -1, Some(30));
        assert!((r.value() - 1234.5).abs() < 1e-9);
        assert_eq!(r.unit_symbol(), "Wh");

        let r = MeasurementRecord::new(ObisCode::ACTIVE_POWER, 42, 2, None);
        assert!((r.value() - 4200.0).abs() < 1e-9);
        assert_eq!(r.unit_symbol(), "");
    }
}
