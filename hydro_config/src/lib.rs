#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the hydroponic controller.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Times of day are written as `"HH:MM"` and parsed into `chrono::NaiveTime`.
//! - `validate()` enforces ranges and the cadence rule: the tick interval is
//!   the single loop cadence and must be shorter than every grace period and
//!   the EC dosing window.
use std::path::PathBuf;

use chrono::{NaiveTime, Timelike};
use serde::Deserialize;
use serde::de::{self, Deserializer};

fn de_hhmm<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_hhmm(&s).map_err(de::Error::custom)
}

/// Parse a strict 24-hour `"HH:MM"` time of day.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| format!("invalid time {s:?} (expected HH:MM): {e}"))
}

fn hhmm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Loop period in seconds; every policy is evaluated once per tick.
    pub tick_secs: u64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self { tick_secs: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClimateCfg {
    pub high_temp_c: f64,
    pub low_temp_c: f64,
    pub high_humidity_pct: f64,
    pub low_humidity_pct: f64,
}

impl Default for ClimateCfg {
    fn default() -> Self {
        Self {
            high_temp_c: 30.0,
            low_temp_c: 25.0,
            high_humidity_pct: 80.0,
            low_humidity_pct: 40.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhCfg {
    pub min: f64,
    pub max: f64,
    /// How long one pH-up or pH-down dose runs.
    pub dose_secs: u64,
    /// Minimum spacing between the starts of two pH doses.
    pub settle_secs: u64,
}

impl Default for PhCfg {
    fn default() -> Self {
        Self {
            min: 5.5,
            max: 7.5,
            dose_secs: 10,
            settle_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EcCfg {
    /// mS/cm; nutrients are dosed when the average falls below this.
    pub min: f64,
    /// mS/cm; above this only the status LED reacts.
    pub max: f64,
    #[serde(deserialize_with = "de_hhmm")]
    pub window_start: NaiveTime,
    #[serde(deserialize_with = "de_hhmm")]
    pub window_end: NaiveTime,
    /// Run time of each nutrient pump (A then B).
    pub nutrient_dose_secs: u64,
}

impl EcCfg {
    /// Length of the daily dosing window in seconds (0 when inverted).
    pub fn window_len_secs(&self) -> u64 {
        let start = self.window_start.num_seconds_from_midnight();
        let end = self.window_end.num_seconds_from_midnight();
        u64::from(end.saturating_sub(start))
    }
}

impl Default for EcCfg {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 2.5,
            window_start: hhmm(15, 0),
            window_end: hhmm(15, 5),
            nutrient_dose_secs: 20,
        }
    }
}

/// A daily on/off schedule with a grace period in minutes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleCfg {
    #[serde(deserialize_with = "de_hhmm")]
    pub on: NaiveTime,
    #[serde(deserialize_with = "de_hhmm")]
    pub off: NaiveTime,
    pub grace_min: u32,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            on: hhmm(6, 0),
            off: hhmm(18, 0),
            grace_min: 5,
        }
    }
}

/// Circulation pump schedule plus the tank refill limit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CirculationCfg {
    #[serde(deserialize_with = "de_hhmm")]
    pub on: NaiveTime,
    #[serde(deserialize_with = "de_hhmm")]
    pub off: NaiveTime,
    pub grace_min: u32,
    /// Maximum duration of one tank refill.
    pub fill_secs: u64,
}

impl CirculationCfg {
    pub fn schedule(&self) -> ScheduleCfg {
        ScheduleCfg {
            on: self.on,
            off: self.off,
            grace_min: self.grace_min,
        }
    }
}

impl Default for CirculationCfg {
    fn default() -> Self {
        let s = ScheduleCfg::default();
        Self {
            on: s.on,
            off: s.off,
            grace_min: s.grace_min,
            fill_secs: 180,
        }
    }
}

/// Probe reference voltages measured in buffer solutions.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CalibrationCfg {
    /// Probe volts in pH 4.0 buffer.
    pub ph4_v: f64,
    /// Probe volts in pH 7.0 buffer.
    pub ph7_v: f64,
    /// Probe volts in the 1413 µS/cm reference solution at 25 °C.
    pub ec1413_v: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Logging {
    /// Directory for rotating log files; console only when absent.
    pub dir: Option<PathBuf>,
    /// "trace" | "debug" | "info" | "warn" | "error"
    pub level: Option<String>,
    /// Log rotation policy: "never" | "minutely" | "hourly" | "daily" (default: daily)
    pub rotation: Option<String>,
    /// Number of rotated files kept on disk.
    pub max_files: usize,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            dir: None,
            level: None,
            rotation: None,
            max_files: 3,
        }
    }
}

/// BCM pin numbers of the Raspberry Pi backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub water_pump: u8,
    pub water_valve: u8,
    pub buzzer: u8,
    /// One pin per shelf; all switch together.
    pub light: Vec<u8>,
    pub vent: u8,
    pub green_led: u8,
    pub red_led: u8,
    pub blue_led: u8,
    pub water_led: u8,
    pub fertilization_pump_a: u8,
    pub fertilization_pump_b: u8,
    pub ph_up_pump: u8,
    pub ph_down_pump: u8,
    pub water_level_bottom: u8,
    pub water_level_top: u8,
    pub door: u8,
    pub button: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            water_pump: 18,
            water_valve: 23,
            buzzer: 22,
            light: vec![0, 1, 12],
            vent: 24,
            green_led: 20,
            red_led: 7,
            blue_led: 8,
            water_led: 9,
            fertilization_pump_a: 5,
            fertilization_pump_b: 6,
            ph_up_pump: 13,
            ph_down_pump: 19,
            water_level_bottom: 27,
            water_level_top: 17,
            door: 11,
            button: 21,
        }
    }
}

impl Pins {
    /// Every configured pin with the name of its role.
    pub fn all(&self) -> Vec<(&'static str, u8)> {
        let mut v = vec![
            ("water_pump", self.water_pump),
            ("water_valve", self.water_valve),
            ("buzzer", self.buzzer),
            ("vent", self.vent),
            ("green_led", self.green_led),
            ("red_led", self.red_led),
            ("blue_led", self.blue_led),
            ("water_led", self.water_led),
            ("fertilization_pump_a", self.fertilization_pump_a),
            ("fertilization_pump_b", self.fertilization_pump_b),
            ("ph_up_pump", self.ph_up_pump),
            ("ph_down_pump", self.ph_down_pump),
            ("water_level_bottom", self.water_level_bottom),
            ("water_level_top", self.water_level_top),
            ("door", self.door),
            ("button", self.button),
        ];
        v.extend(self.light.iter().map(|&p| ("light", p)));
        v
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Hardware {
    pub i2c_bus: u8,
    pub ph_adc_address: u16,
    pub ec_adc_address: u16,
    /// Max time to wait for an ADS1115 conversion before failing the read.
    pub conversion_timeout_ms: u64,
    /// DS18B20 device directory under /sys/bus/w1/devices.
    pub w1_device: Option<PathBuf>,
    /// IIO device directory of the DHT air sensor.
    pub iio_device: Option<PathBuf>,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            ph_adc_address: 0x49,
            ec_adc_address: 0x48,
            conversion_timeout_ms: 20,
            w1_device: None,
            iio_device: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub climate: ClimateCfg,
    #[serde(default)]
    pub ph: PhCfg,
    #[serde(default)]
    pub ec: EcCfg,
    #[serde(default)]
    pub lighting: ScheduleCfg,
    #[serde(default)]
    pub circulation: CirculationCfg,
    /// Required to start the loop; kept optional here so its absence is
    /// reported as a calibration problem rather than a parse error.
    #[serde(default)]
    pub calibration: Option<CalibrationCfg>,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub pins: Pins,
    #[serde(default)]
    pub hardware: Hardware,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn check_band(name: &str, low: f64, high: f64) -> eyre::Result<()> {
    if !low.is_finite() || !high.is_finite() {
        eyre::bail!("{name} thresholds must be finite");
    }
    if low >= high {
        eyre::bail!("{name}: low threshold ({low}) must be < high threshold ({high})");
    }
    Ok(())
}

fn check_schedule(name: &str, s: &ScheduleCfg, tick_secs: u64) -> eyre::Result<()> {
    if s.on >= s.off {
        eyre::bail!(
            "{name}.on ({}) must be earlier than {name}.off ({})",
            s.on.format("%H:%M"),
            s.off.format("%H:%M")
        );
    }
    if s.grace_min == 0 {
        eyre::bail!("{name}.grace_min must be >= 1");
    }
    if tick_secs >= u64::from(s.grace_min) * 60 {
        eyre::bail!(
            "control.tick_secs ({tick_secs}) must be shorter than {name}.grace_min ({} min)",
            s.grace_min
        );
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Control
        let tick = self.control.tick_secs;
        if tick == 0 {
            eyre::bail!("control.tick_secs must be >= 1");
        }

        // Climate
        check_band(
            "climate temperature",
            self.climate.low_temp_c,
            self.climate.high_temp_c,
        )?;
        check_band(
            "climate humidity",
            self.climate.low_humidity_pct,
            self.climate.high_humidity_pct,
        )?;

        // pH
        check_band("ph", self.ph.min, self.ph.max)?;
        if self.ph.min < 0.0 || self.ph.max > 14.0 {
            eyre::bail!("ph.min/ph.max must lie within 0..=14");
        }
        if self.ph.dose_secs == 0 {
            eyre::bail!("ph.dose_secs must be >= 1");
        }
        if self.ph.settle_secs < self.ph.dose_secs {
            eyre::bail!("ph.settle_secs must be >= ph.dose_secs");
        }

        // EC
        check_band("ec", self.ec.min, self.ec.max)?;
        if self.ec.min < 0.0 {
            eyre::bail!("ec.min must be >= 0");
        }
        if self.ec.nutrient_dose_secs == 0 {
            eyre::bail!("ec.nutrient_dose_secs must be >= 1");
        }
        if self.ec.window_start >= self.ec.window_end {
            eyre::bail!("ec.window_start must be earlier than ec.window_end");
        }
        if tick >= self.ec.window_len_secs() {
            eyre::bail!(
                "control.tick_secs ({tick}) must be shorter than the EC dosing window ({} s)",
                self.ec.window_len_secs()
            );
        }

        // Schedules
        check_schedule("lighting", &self.lighting, tick)?;
        check_schedule("circulation", &self.circulation.schedule(), tick)?;
        if self.circulation.fill_secs == 0 {
            eyre::bail!("circulation.fill_secs must be >= 1");
        }

        // Logging
        if self.logging.max_files == 0 {
            eyre::bail!("logging.max_files must be >= 1");
        }
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "minutely" | "hourly" | "daily")
        {
            eyre::bail!("logging.rotation must be one of never|minutely|hourly|daily, got {r:?}");
        }

        // Pins
        if self.pins.light.is_empty() {
            eyre::bail!("pins.light must list at least one pin");
        }
        let all = self.pins.all();
        for (i, (name, pin)) in all.iter().enumerate() {
            if *pin > 27 {
                eyre::bail!("pins.{name} = {pin} is not a valid BCM GPIO (0..=27)");
            }
            if let Some((other, _)) = all[..i].iter().find(|(_, p)| p == pin) {
                eyre::bail!("pins.{name} and pins.{other} both use GPIO {pin}");
            }
        }

        // Hardware
        if self.hardware.conversion_timeout_ms == 0 {
            eyre::bail!("hardware.conversion_timeout_ms must be >= 1");
        }
        if self.hardware.ph_adc_address == self.hardware.ec_adc_address {
            eyre::bail!("hardware.ph_adc_address and ec_adc_address must differ");
        }

        Ok(())
    }
}
