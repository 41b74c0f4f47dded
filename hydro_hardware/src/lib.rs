//! Hardware backends for the hydroponic controller.
//!
//! The simulated plant is always available. The Raspberry Pi backend (GPIO,
//! ADS1115 over I²C, sysfs temperature sensors) is compiled with the
//! `hardware` feature.
pub mod error;
pub mod sim;
pub mod sysfs;
pub mod util;

#[cfg(feature = "hardware")]
pub mod ads1115;
#[cfg(feature = "hardware")]
pub mod rpi;

pub use error::HwError;
pub use sim::{PlantModel, SimulatedActuators, SimulatedPlant, SimulatedSensors};

#[cfg(feature = "hardware")]
pub use rpi::{ActuatorPins, BusConfig, RpiActuators, RpiSensors, SensorPins};
