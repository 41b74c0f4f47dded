//! Probe calibration: volts to pH and to temperature-compensated EC.
use crate::error::ControlError;

/// pH of the acidic reference buffer.
pub const PH_ACID_REF: f64 = 4.0;
/// pH of the neutral reference buffer.
pub const PH_NEUTRAL_REF: f64 = 7.0;
/// Conductivity of the EC reference solution, mS/cm at 25 °C.
pub const EC_REF_MS_CM: f64 = 1.413;
/// Linear temperature coefficient of nutrient solutions, per °C.
pub const EC_TEMP_COEFF: f64 = 0.0185;
/// Temperature the EC reading is normalised to.
pub const EC_REF_TEMP_C: f64 = 25.0;

/// Reference voltages captured with the probes in buffer solutions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeCalibration {
    ph4_v: f64,
    ph7_v: f64,
    ec1413_v: f64,
}

impl ProbeCalibration {
    pub fn new(ph4_v: f64, ph7_v: f64, ec1413_v: f64) -> Result<Self, ControlError> {
        if ![ph4_v, ph7_v, ec1413_v].iter().all(|v| v.is_finite()) {
            return Err(ControlError::Calibration(
                "reference voltages must be finite".into(),
            ));
        }
        if (ph7_v - ph4_v).abs() < f64::EPSILON {
            return Err(ControlError::Calibration(format!(
                "ph4_v and ph7_v must differ (both {ph7_v} V)"
            )));
        }
        if ec1413_v <= 0.0 {
            return Err(ControlError::Calibration(format!(
                "ec1413_v must be > 0, got {ec1413_v} V"
            )));
        }
        Ok(Self {
            ph4_v,
            ph7_v,
            ec1413_v,
        })
    }

    /// Two-point linear interpolation through (ph4_v, 4.0) and (ph7_v, 7.0).
    pub fn ph(&self, volts: f64) -> f64 {
        let slope = (PH_NEUTRAL_REF - PH_ACID_REF) / (self.ph7_v - self.ph4_v);
        PH_NEUTRAL_REF + (volts - self.ph7_v) * slope
    }

    /// Conductivity in mS/cm normalised to 25 °C. Without a water temperature
    /// the reading is taken as already at 25 °C.
    pub fn ec(&self, volts: f64, water_temp_c: Option<f64>) -> f64 {
        let t = water_temp_c
            .filter(|t| t.is_finite())
            .unwrap_or(EC_REF_TEMP_C)
            .clamp(0.0, 50.0);
        let raw = volts / self.ec1413_v * EC_REF_MS_CM;
        raw / (1.0 + EC_TEMP_COEFF * (t - EC_REF_TEMP_C))
    }
}
