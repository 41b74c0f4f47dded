//! Raspberry Pi backend: GPIO relays and switches, ADS1115 probes, sysfs
//! temperature/humidity sensors.
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use hydro_traits::{Actuator, Actuators, Reading, Sensor, Sensors};
use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::ads1115::{Ads1115, Gain};
use crate::error::{HwError, Result};
use crate::sysfs::{IioAirSensor, W1Thermometer};

/// Number of ADC conversions averaged per probe read.
const PROBE_SAMPLES: usize = 5;

/// BCM pin numbers of every output. The grow light may span several shelves.
#[derive(Debug, Clone)]
pub struct ActuatorPins {
    pub water_pump: u8,
    pub water_valve: u8,
    pub buzzer: u8,
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
}

impl ActuatorPins {
    fn pins_for(&self, a: Actuator) -> Vec<u8> {
        match a {
            Actuator::WaterPump => vec![self.water_pump],
            Actuator::WaterValve => vec![self.water_valve],
            Actuator::Buzzer => vec![self.buzzer],
            Actuator::Light => self.light.clone(),
            Actuator::Vent => vec![self.vent],
            Actuator::GreenLed => vec![self.green_led],
            Actuator::RedLed => vec![self.red_led],
            Actuator::BlueLed => vec![self.blue_led],
            Actuator::WaterLed => vec![self.water_led],
            Actuator::FertilizationPumpA => vec![self.fertilization_pump_a],
            Actuator::FertilizationPumpB => vec![self.fertilization_pump_b],
            Actuator::PhUpPump => vec![self.ph_up_pump],
            Actuator::PhDownPump => vec![self.ph_down_pump],
        }
    }
}

/// BCM pin numbers of the digital inputs (all wired active-low with pull-ups).
#[derive(Debug, Clone, Copy)]
pub struct SensorPins {
    pub water_level_bottom: u8,
    pub water_level_top: u8,
    pub door: u8,
    pub button: u8,
}

/// Bus addresses and sysfs locations of the analog sensors.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub i2c_bus: u8,
    pub ph_adc_address: u16,
    pub ec_adc_address: u16,
    pub conversion_timeout: Duration,
    /// DS18B20 device directory, e.g. `/sys/bus/w1/devices/28-0316a2791aff`.
    pub w1_device: Option<PathBuf>,
    /// IIO directory of the DHT driver, e.g. `/sys/bus/iio/devices/iio:device0`.
    pub iio_device: Option<PathBuf>,
}

pub struct RpiActuators {
    outputs: HashMap<Actuator, Vec<OutputPin>>,
}

impl RpiActuators {
    pub fn new(pins: &ActuatorPins) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut outputs = HashMap::new();
        for a in Actuator::ALL {
            let mut group = Vec::new();
            for pin in pins.pins_for(a) {
                let mut out = gpio
                    .get(pin)
                    .map_err(|e| HwError::Gpio(format!("open {a} pin {pin}: {e}")))?
                    .into_output();
                out.set_low();
                group.push(out);
            }
            outputs.insert(a, group);
        }
        Ok(Self { outputs })
    }
}

impl Actuators for RpiActuators {
    fn set(
        &mut self,
        actuator: Actuator,
        on: bool,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let group = self
            .outputs
            .get_mut(&actuator)
            .ok_or(HwError::NotWired(actuator.as_str()))?;
        for pin in group.iter_mut() {
            if on {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
        tracing::debug!(actuator = %actuator, on, "gpio write");
        Ok(())
    }
}

pub struct RpiSensors {
    bottom: InputPin,
    top: InputPin,
    door: InputPin,
    button: InputPin,
    ph_adc: Ads1115,
    ec_adc: Ads1115,
    water: Option<W1Thermometer>,
    air: Option<IioAirSensor>,
}

impl RpiSensors {
    pub fn new(pins: SensorPins, bus: &BusConfig) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let input = |pin: u8| -> Result<InputPin> {
            Ok(gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(format!("open input pin {pin}: {e}")))?
                .into_input_pullup())
        };
        Ok(Self {
            bottom: input(pins.water_level_bottom)?,
            top: input(pins.water_level_top)?,
            door: input(pins.door)?,
            button: input(pins.button)?,
            ph_adc: Ads1115::new(bus.i2c_bus, bus.ph_adc_address, bus.conversion_timeout)?,
            ec_adc: Ads1115::new(bus.i2c_bus, bus.ec_adc_address, bus.conversion_timeout)?,
            water: bus.w1_device.as_ref().map(W1Thermometer::new),
            air: bus.iio_device.as_ref().map(IioAirSensor::new),
        })
    }

    fn sample(&mut self, sensor: Sensor) -> Result<Reading> {
        let reading = match sensor {
            Sensor::Ph => Reading::Analog(
                self.ph_adc
                    .read_mean(PROBE_SAMPLES, |adc| adc.read_volts(Gain::One))?,
            ),
            Sensor::Ec => Reading::Analog(
                self.ec_adc
                    .read_mean(PROBE_SAMPLES, Ads1115::read_volts_autorange)?,
            ),
            Sensor::WaterTemperature => Reading::Analog(
                self.water
                    .as_ref()
                    .ok_or(HwError::NotWired("water_temperature"))?
                    .read_celsius()?,
            ),
            Sensor::AirTemperature => Reading::Analog(
                self.air
                    .as_ref()
                    .ok_or(HwError::NotWired("air_temperature"))?
                    .read_celsius()?,
            ),
            Sensor::AirHumidity => Reading::Analog(
                self.air
                    .as_ref()
                    .ok_or(HwError::NotWired("air_humidity"))?
                    .read_humidity_pct()?,
            ),
            // Switches pull the line low when active.
            Sensor::WaterLevelBottom => Reading::Digital(self.bottom.is_low()),
            Sensor::WaterLevelTop => Reading::Digital(self.top.is_low()),
            // Door reed switch is closed (low) while the door is shut.
            Sensor::Door => Reading::Digital(self.door.is_high()),
            Sensor::Button => Reading::Digital(self.button.is_low()),
        };
        Ok(reading)
    }
}

impl Sensors for RpiSensors {
    fn read(
        &mut self,
        sensor: Sensor,
    ) -> std::result::Result<Reading, Box<dyn std::error::Error + Send + Sync>> {
        match self.sample(sensor) {
            Ok(r) => {
                tracing::trace!(sensor = %sensor, reading = %r, "sensor read");
                Ok(r)
            }
            Err(e) => {
                tracing::error!(sensor = %sensor, error = %e, "sensor read error");
                Err(Box::new(e))
            }
        }
    }
}
