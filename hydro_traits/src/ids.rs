//! Sensor and actuator identifiers shared by the HAL and the control loop.

use std::fmt;

/// Every input the enclosure exposes.
///
/// Level switches and the door/button are digital; the rest are analog.
/// For `WaterLevelBottom` a `true` reading means the water has dropped below
/// the bottom probe (low water); for `WaterLevelTop` it means the tank is full.
/// `Ph` and `Ec` report probe volts; conversion happens in the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sensor {
    Ph,
    Ec,
    WaterTemperature,
    AirTemperature,
    AirHumidity,
    WaterLevelBottom,
    WaterLevelTop,
    Door,
    Button,
}

impl Sensor {
    pub const ALL: [Sensor; 9] = [
        Sensor::Ph,
        Sensor::Ec,
        Sensor::WaterTemperature,
        Sensor::AirTemperature,
        Sensor::AirHumidity,
        Sensor::WaterLevelBottom,
        Sensor::WaterLevelTop,
        Sensor::Door,
        Sensor::Button,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sensor::Ph => "ph",
            Sensor::Ec => "ec",
            Sensor::WaterTemperature => "water_temperature",
            Sensor::AirTemperature => "air_temperature",
            Sensor::AirHumidity => "air_humidity",
            Sensor::WaterLevelBottom => "water_level_bottom",
            Sensor::WaterLevelTop => "water_level_top",
            Sensor::Door => "door",
            Sensor::Button => "button",
        }
    }

    /// True for on/off inputs (level switches, door, button).
    pub fn is_digital(self) -> bool {
        matches!(
            self,
            Sensor::WaterLevelBottom | Sensor::WaterLevelTop | Sensor::Door | Sensor::Button
        )
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every output the enclosure exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Actuator {
    WaterPump,
    WaterValve,
    Buzzer,
    Light,
    Vent,
    GreenLed,
    RedLed,
    BlueLed,
    WaterLed,
    FertilizationPumpA,
    FertilizationPumpB,
    PhUpPump,
    PhDownPump,
}

impl Actuator {
    pub const ALL: [Actuator; 13] = [
        Actuator::WaterPump,
        Actuator::WaterValve,
        Actuator::Buzzer,
        Actuator::Light,
        Actuator::Vent,
        Actuator::GreenLed,
        Actuator::RedLed,
        Actuator::BlueLed,
        Actuator::WaterLed,
        Actuator::FertilizationPumpA,
        Actuator::FertilizationPumpB,
        Actuator::PhUpPump,
        Actuator::PhDownPump,
    ];

    /// Pumps that dispense chemicals for a fixed duration.
    pub const DOSING_PUMPS: [Actuator; 4] = [
        Actuator::PhUpPump,
        Actuator::PhDownPump,
        Actuator::FertilizationPumpA,
        Actuator::FertilizationPumpB,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Actuator::WaterPump => "water_pump",
            Actuator::WaterValve => "water_valve",
            Actuator::Buzzer => "buzzer",
            Actuator::Light => "light",
            Actuator::Vent => "vent",
            Actuator::GreenLed => "green_led",
            Actuator::RedLed => "red_led",
            Actuator::BlueLed => "blue_led",
            Actuator::WaterLed => "water_led",
            Actuator::FertilizationPumpA => "fertilization_pump_a",
            Actuator::FertilizationPumpB => "fertilization_pump_b",
            Actuator::PhUpPump => "ph_up_pump",
            Actuator::PhDownPump => "ph_down_pump",
        }
    }

    pub fn is_dosing_pump(self) -> bool {
        Self::DOSING_PUMPS.contains(&self)
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single sensor sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Analog(f64),
    Digital(bool),
}

impl Reading {
    /// Numeric view; digital readings map to 0.0/1.0.
    pub fn as_f64(self) -> f64 {
        match self {
            Reading::Analog(v) => v,
            Reading::Digital(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Boolean view; analog readings are true when non-zero.
    pub fn as_bool(self) -> bool {
        match self {
            Reading::Analog(v) => v != 0.0,
            Reading::Digital(b) => b,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Analog(v) => write!(f, "{v:.3}"),
            Reading::Digital(b) => write!(f, "{b}"),
        }
    }
}
