use std::time::Duration;
use tracing::trace;

use rppal::i2c::I2c;

use crate::error::{HwError, Result};
use crate::util::{round3, wait_until_ready_with_timeout};

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

// OS=1 (start), MUX=000 (AIN0-AIN1), MODE=1 (single-shot), DR=100 (128 SPS),
// comparator disabled. PGA bits are or-ed in per read.
const CONFIG_BASE: u16 = 0x8000 | 0x0100 | 0x0080 | 0x0003;
const OS_READY: u16 = 0x8000;

/// Programmable gain (full-scale range) of the ADS1115.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    /// ±6.144 V
    TwoThirds,
    /// ±4.096 V
    One,
    /// ±2.048 V
    Two,
}

impl Gain {
    fn pga_bits(self) -> u16 {
        match self {
            Gain::TwoThirds => 0b000 << 9,
            Gain::One => 0b001 << 9,
            Gain::Two => 0b010 << 9,
        }
    }

    pub fn full_scale_volts(self) -> f64 {
        match self {
            Gain::TwoThirds => 6.144,
            Gain::One => 4.096,
            Gain::Two => 2.048,
        }
    }
}

/// Single-shot differential reader for one ADS1115 on the I²C bus.
pub struct Ads1115 {
    i2c: I2c,
    conversion_timeout: Duration,
}

impl Ads1115 {
    pub fn new(bus: u8, address: u16, conversion_timeout: Duration) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(format!("open bus {bus}: {e}")))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(format!("address {address:#04x}: {e}")))?;
        Ok(Self {
            i2c,
            conversion_timeout,
        })
    }

    /// One differential conversion (AIN0-AIN1), raw signed counts.
    pub fn read_raw(&mut self, gain: Gain) -> Result<i16> {
        let config = CONFIG_BASE | gain.pga_bits();
        let [hi, lo] = config.to_be_bytes();
        self.i2c
            .write(&[REG_CONFIG, hi, lo])
            .map_err(|e| HwError::I2c(e.to_string()))?;

        let i2c = &mut self.i2c;
        wait_until_ready_with_timeout(
            || {
                let mut buf = [0u8; 2];
                i2c.write_read(&[REG_CONFIG], &mut buf)
                    .map_err(|e| HwError::I2c(e.to_string()))?;
                Ok(u16::from_be_bytes(buf) & OS_READY != 0)
            },
            self.conversion_timeout,
            Duration::from_micros(500),
        )?;

        let mut buf = [0u8; 2];
        self.i2c
            .write_read(&[REG_CONVERSION], &mut buf)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        let raw = i16::from_be_bytes(buf);
        trace!(raw, ?gain, "ads1115 raw read");
        Ok(raw)
    }

    /// Differential voltage at a fixed gain.
    pub fn read_volts(&mut self, gain: Gain) -> Result<f64> {
        let raw = self.read_raw(gain)?;
        Ok(f64::from(raw) * gain.full_scale_volts() / f64::from(i16::MAX))
    }

    /// Voltage using the most sensitive gain that does not saturate.
    pub fn read_volts_autorange(&mut self) -> Result<f64> {
        for gain in [Gain::Two, Gain::One] {
            let raw = self.read_raw(gain)?;
            if raw < i16::MAX && raw > i16::MIN {
                return Ok(f64::from(raw) * gain.full_scale_volts() / f64::from(i16::MAX));
            }
        }
        self.read_volts(Gain::TwoThirds)
    }

    /// Mean of `n` conversions rounded to millivolts.
    pub fn read_mean(
        &mut self,
        n: usize,
        mut read: impl FnMut(&mut Self) -> Result<f64>,
    ) -> Result<f64> {
        let n = n.max(1);
        let mut sum = 0.0;
        for _ in 0..n {
            sum += read(self)?;
        }
        Ok(round3(sum / n as f64))
    }
}
