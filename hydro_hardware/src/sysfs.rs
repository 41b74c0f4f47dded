//! Kernel-driver backed sensors read through sysfs.
//!
//! - DS18B20 water probe: `/sys/bus/w1/devices/28-*/w1_slave`
//! - DHT11/DHT22 air sensor (dht11 overlay): IIO `in_temp_input` and
//!   `in_humidityrelative_input`, both in milli-units.
use std::path::{Path, PathBuf};

use crate::error::{HwError, Result};

/// Parse the two-line `w1_slave` payload and return degrees Celsius.
///
/// The first line must end in `YES` (CRC ok); the second carries `t=<milli-C>`.
pub fn parse_w1_slave(text: &str) -> Result<f64> {
    let mut lines = text.lines();
    let crc = lines
        .next()
        .ok_or_else(|| HwError::Parse("empty w1_slave".into()))?;
    if !crc.trim_end().ends_with("YES") {
        return Err(HwError::Parse("w1 crc check failed".into()));
    }
    let data = lines
        .next()
        .ok_or_else(|| HwError::Parse("missing w1 temperature line".into()))?;
    let raw = data
        .rsplit_once("t=")
        .map(|(_, v)| v.trim())
        .ok_or_else(|| HwError::Parse("missing t= field".into()))?;
    let milli: i64 = raw
        .parse()
        .map_err(|e| HwError::Parse(format!("bad w1 temperature {raw:?}: {e}")))?;
    Ok(milli as f64 / 1000.0)
}

/// Parse an IIO milli-unit attribute (e.g. `23400` → 23.4).
pub fn parse_iio_milli(text: &str) -> Result<f64> {
    let raw = text.trim();
    let milli: i64 = raw
        .parse()
        .map_err(|e| HwError::Parse(format!("bad iio value {raw:?}: {e}")))?;
    Ok(milli as f64 / 1000.0)
}

/// DS18B20 probe bound to one 1-Wire device directory.
#[derive(Debug, Clone)]
pub struct W1Thermometer {
    slave: PathBuf,
}

impl W1Thermometer {
    pub fn new(device_dir: impl AsRef<Path>) -> Self {
        Self {
            slave: device_dir.as_ref().join("w1_slave"),
        }
    }

    pub fn read_celsius(&self) -> Result<f64> {
        let text = std::fs::read_to_string(&self.slave)?;
        parse_w1_slave(&text)
    }
}

/// DHT-family air sensor exposed through an IIO device directory.
#[derive(Debug, Clone)]
pub struct IioAirSensor {
    dir: PathBuf,
}

impl IioAirSensor {
    pub fn new(device_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: device_dir.as_ref().to_path_buf(),
        }
    }

    pub fn read_celsius(&self) -> Result<f64> {
        let text = std::fs::read_to_string(self.dir.join("in_temp_input"))?;
        parse_iio_milli(&text)
    }

    pub fn read_humidity_pct(&self) -> Result<f64> {
        let text = std::fs::read_to_string(self.dir.join("in_humidityrelative_input"))?;
        parse_iio_milli(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_w1_payload() {
        let text = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";
        let t = parse_w1_slave(text).expect("valid payload");
        assert!((t - 23.125).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_crc() {
        let text = "72 01 4b 46 7f ff 0e 10 57 : crc=57 NO\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";
        let err = parse_w1_slave(text).expect_err("crc must fail");
        assert!(err.to_string().contains("crc"));
    }

    #[test]
    fn parses_negative_and_iio_values() {
        let text = "ff ff : crc=aa YES\nff ff t=-1250\n";
        assert!((parse_w1_slave(text).unwrap() + 1.25).abs() < 1e-9);
        assert!((parse_iio_milli("61300\n").unwrap() - 61.3).abs() < 1e-9);
        assert!(parse_iio_milli("n/a").is_err());
    }
}
