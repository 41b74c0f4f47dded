pub mod clock;
pub mod ids;

pub use clock::{Clock, LocalWallClock, MonotonicClock, WallClock};
pub use ids::{Actuator, Reading, Sensor};

/// Read side of the hardware abstraction layer.
///
/// Implementations report failures and never retry internally; the control
/// loop decides what a missing sample means.
pub trait Sensors {
    fn read(
        &mut self,
        sensor: Sensor,
    ) -> Result<Reading, Box<dyn std::error::Error + Send + Sync>>;
}

/// Write side of the hardware abstraction layer.
pub trait Actuators {
    fn set(
        &mut self,
        actuator: Actuator,
        on: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Sensors + ?Sized> Sensors for Box<T> {
    fn read(
        &mut self,
        sensor: Sensor,
    ) -> Result<Reading, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(sensor)
    }
}

impl<T: Actuators + ?Sized> Actuators for Box<T> {
    fn set(
        &mut self,
        actuator: Actuator,
        on: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set(actuator, on)
    }
}
