//! Runtime configuration for the control loop.
//!
//! These are validated, typed versions of the TOML sections in
//! `hydro_config`; see `conversions` for the mapping.
use std::time::Duration;

use chrono::{NaiveTime, TimeDelta};

use crate::calibration::ProbeCalibration;
use crate::hysteresis::Band;
use crate::schedule::Schedule;

/// Vent thresholds. The vent opens when either signal rises above its band
/// and closes only when both fall below.
#[derive(Debug, Clone, Copy)]
pub struct ClimateCfg {
    pub temperature: Band,
    pub humidity: Band,
}

#[derive(Debug, Clone, Copy)]
pub struct PhCfg {
    /// `[PH_MIN, PH_MAX]`
    pub band: Band,
    pub dose: Duration,
    /// Minimum time between the starts of two pH doses.
    pub settle: TimeDelta,
}

#[derive(Debug, Clone, Copy)]
pub struct EcCfg {
    /// `[EC_MIN, EC_MAX]` in mS/cm.
    pub band: Band,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    /// Run time of each nutrient pump.
    pub nutrient_dose: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct CirculationCfg {
    pub schedule: Schedule,
    /// Upper bound on one tank refill.
    pub fill: TimeDelta,
}

/// Everything the controller needs; fixed for the lifetime of the loop.
#[derive(Debug, Clone, Copy)]
pub struct ControllerCfg {
    pub tick: Duration,
    pub climate: ClimateCfg,
    pub ph: PhCfg,
    pub ec: EcCfg,
    pub lighting: Schedule,
    pub circulation: CirculationCfg,
    pub calibration: ProbeCalibration,
}
