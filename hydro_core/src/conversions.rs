//! `TryFrom` implementations bridging `hydro_config` types to `hydro_core` types.

use crate::calibration::ProbeCalibration;
use crate::config::{CirculationCfg, ClimateCfg, ControllerCfg, EcCfg, PhCfg};
use crate::error::ControlError;
use crate::hysteresis::Band;
use crate::schedule::Schedule;
use crate::util::to_time_delta;
use std::time::Duration;

fn band(name: &str, low: f64, high: f64) -> Result<Band, ControlError> {
    Band::new(low, high).map_err(|e| ControlError::State(format!("{name}: {e}")))
}

// ── Schedules ────────────────────────────────────────────────────────────────

impl TryFrom<&hydro_config::ScheduleCfg> for Schedule {
    type Error = ControlError;
    fn try_from(c: &hydro_config::ScheduleCfg) -> Result<Self, Self::Error> {
        Schedule::new(c.on, c.off, c.grace_min)
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl TryFrom<&hydro_config::CalibrationCfg> for ProbeCalibration {
    type Error = ControlError;
    fn try_from(c: &hydro_config::CalibrationCfg) -> Result<Self, Self::Error> {
        ProbeCalibration::new(c.ph4_v, c.ph7_v, c.ec1413_v)
    }
}

// ── Policies ─────────────────────────────────────────────────────────────────

impl TryFrom<&hydro_config::ClimateCfg> for ClimateCfg {
    type Error = ControlError;
    fn try_from(c: &hydro_config::ClimateCfg) -> Result<Self, Self::Error> {
        Ok(Self {
            temperature: band("climate temperature", c.low_temp_c, c.high_temp_c)?,
            humidity: band("climate humidity", c.low_humidity_pct, c.high_humidity_pct)?,
        })
    }
}

impl TryFrom<&hydro_config::PhCfg> for PhCfg {
    type Error = ControlError;
    fn try_from(c: &hydro_config::PhCfg) -> Result<Self, Self::Error> {
        Ok(Self {
            band: band("ph", c.min, c.max)?,
            dose: Duration::from_secs(c.dose_secs),
            settle: to_time_delta(Duration::from_secs(c.settle_secs)),
        })
    }
}

impl TryFrom<&hydro_config::EcCfg> for EcCfg {
    type Error = ControlError;
    fn try_from(c: &hydro_config::EcCfg) -> Result<Self, Self::Error> {
        if c.window_start >= c.window_end {
            return Err(ControlError::ScheduleConfig(
                "ec dosing window start must be earlier than its end".into(),
            ));
        }
        Ok(Self {
            band: band("ec", c.min, c.max)?,
            window_start: c.window_start,
            window_end: c.window_end,
            nutrient_dose: Duration::from_secs(c.nutrient_dose_secs),
        })
    }
}

impl TryFrom<&hydro_config::CirculationCfg> for CirculationCfg {
    type Error = ControlError;
    fn try_from(c: &hydro_config::CirculationCfg) -> Result<Self, Self::Error> {
        Ok(Self {
            schedule: Schedule::try_from(&c.schedule())?,
            fill: to_time_delta(Duration::from_secs(c.fill_secs)),
        })
    }
}

// ── Whole controller ─────────────────────────────────────────────────────────

impl TryFrom<&hydro_config::Config> for ControllerCfg {
    type Error = ControlError;
    fn try_from(c: &hydro_config::Config) -> Result<Self, Self::Error> {
        let calibration = c.calibration.as_ref().ok_or_else(|| {
            ControlError::Calibration("no [calibration] section in config".into())
        })?;
        Ok(Self {
            tick: Duration::from_secs(c.control.tick_secs),
            climate: ClimateCfg::try_from(&c.climate)?,
            ph: PhCfg::try_from(&c.ph)?,
            ec: EcCfg::try_from(&c.ec)?,
            lighting: Schedule::try_from(&c.lighting)?,
            circulation: CirculationCfg::try_from(&c.circulation)?,
            calibration: ProbeCalibration::try_from(calibration)?,
        })
    }
}

impl ControllerCfg {
    /// Stock thresholds and schedules with the given probe calibration.
    pub fn defaults_with(calibration: ProbeCalibration) -> Result<Self, ControlError> {
        let mut cfg = Self::try_from(&hydro_config::Config {
            calibration: Some(hydro_config::CalibrationCfg {
                ph4_v: 4.0,
                ph7_v: 7.0,
                ec1413_v: 1.413,
            }),
            ..hydro_config::Config::default()
        })?;
        cfg.calibration = calibration;
        Ok(cfg)
    }
}
