//! Simulated enclosure: sensors and actuators share one plant model so
//! commands have visible effects (the valve fills the tank, the vent cools the
//! air, dosing pumps move the probe voltages).
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use hydro_traits::{Actuator, Actuators, Reading, Sensor, Sensors};

use crate::error::{HwError, Result};

/// Level fraction below which the bottom switch reports low water.
pub const BOTTOM_PROBE_LEVEL: f64 = 0.25;
/// Level fraction at which the top switch reports a full tank.
pub const TOP_PROBE_LEVEL: f64 = 0.95;

/// State of the simulated enclosure. Probe values are volts, like the real ADC.
#[derive(Debug, Clone)]
pub struct PlantModel {
    pub ph_volts: f64,
    pub ec_volts: f64,
    pub water_temp_c: f64,
    pub air_temp_c: f64,
    pub humidity_pct: f64,
    /// Tank fill fraction in 0.0..=1.0.
    pub level: f64,
    pub door_open: bool,
    pub button_pressed: bool,
    outputs: HashMap<Actuator, bool>,
    failing: HashSet<Sensor>,
}

impl Default for PlantModel {
    fn default() -> Self {
        Self {
            ph_volts: 1.5,
            ec_volts: 1.1,
            water_temp_c: 21.0,
            air_temp_c: 26.0,
            humidity_pct: 60.0,
            level: 0.6,
            door_open: false,
            button_pressed: false,
            outputs: HashMap::new(),
            failing: HashSet::new(),
        }
    }
}

impl PlantModel {
    /// Default model with the tank at `level` (0.0..=1.0).
    pub fn with_level(level: f64) -> Self {
        Self {
            level: level.clamp(0.0, 1.0),
            ..Self::default()
        }
    }

    /// Default model with the pH probe reading `volts`.
    pub fn with_ph_volts(volts: f64) -> Self {
        Self {
            ph_volts: volts,
            ..Self::default()
        }
    }

    fn on(&self, a: Actuator) -> bool {
        self.outputs.get(&a).copied().unwrap_or(false)
    }

    fn sample(&mut self, sensor: Sensor) -> Result<Reading> {
        if self.failing.contains(&sensor) {
            return Err(HwError::Timeout);
        }
        let reading = match sensor {
            Sensor::Ph => {
                if self.on(Actuator::PhDownPump) {
                    self.ph_volts += 0.01;
                }
                if self.on(Actuator::PhUpPump) {
                    self.ph_volts -= 0.01;
                }
                Reading::Analog(self.ph_volts)
            }
            Sensor::Ec => {
                if self.on(Actuator::FertilizationPumpA) || self.on(Actuator::FertilizationPumpB) {
                    self.ec_volts += 0.02;
                }
                Reading::Analog(self.ec_volts)
            }
            Sensor::WaterTemperature => Reading::Analog(self.water_temp_c),
            Sensor::AirTemperature => {
                let drift = if self.on(Actuator::Vent) { -0.1 } else { 0.05 };
                self.air_temp_c = (self.air_temp_c + drift).clamp(15.0, 35.0);
                Reading::Analog(self.air_temp_c)
            }
            Sensor::AirHumidity => {
                let drift = if self.on(Actuator::Vent) { -0.3 } else { 0.1 };
                self.humidity_pct = (self.humidity_pct + drift).clamp(20.0, 95.0);
                Reading::Analog(self.humidity_pct)
            }
            Sensor::WaterLevelBottom => {
                let delta = if self.on(Actuator::WaterValve) { 0.02 } else { -0.002 };
                self.level = (self.level + delta).clamp(0.0, 1.0);
                Reading::Digital(self.level < BOTTOM_PROBE_LEVEL)
            }
            Sensor::WaterLevelTop => Reading::Digital(self.level >= TOP_PROBE_LEVEL),
            Sensor::Door => Reading::Digital(self.door_open),
            Sensor::Button => Reading::Digital(self.button_pressed),
        };
        Ok(reading)
    }
}

/// Handle to a shared simulated enclosure.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPlant {
    model: Arc<Mutex<PlantModel>>,
}

impl SimulatedPlant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: PlantModel) -> Self {
        Self {
            model: Arc::new(Mutex::new(model)),
        }
    }

    pub fn sensors(&self) -> SimulatedSensors {
        SimulatedSensors {
            plant: self.clone(),
        }
    }

    pub fn actuators(&self) -> SimulatedActuators {
        SimulatedActuators {
            plant: self.clone(),
        }
    }

    /// Mutate the model directly (tests, demos).
    pub fn update(&self, f: impl FnOnce(&mut PlantModel)) -> Result<()> {
        f(&mut *self.lock()?);
        Ok(())
    }

    /// Copy of the current model.
    pub fn snapshot(&self) -> Result<PlantModel> {
        Ok(self.lock()?.clone())
    }

    /// Last state written to `a`; unknown outputs read as off.
    pub fn is_on(&self, a: Actuator) -> bool {
        self.lock().map(|m| m.on(a)).unwrap_or(false)
    }

    /// Make every subsequent read of `sensor` fail with a timeout.
    pub fn fail_sensor(&self, sensor: Sensor) -> Result<()> {
        self.lock()?.failing.insert(sensor);
        Ok(())
    }

    pub fn heal_sensor(&self, sensor: Sensor) -> Result<()> {
        self.lock()?.failing.remove(&sensor);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, PlantModel>> {
        self.model
            .lock()
            .map_err(|_| HwError::Gpio("simulated plant lock poisoned".into()))
    }
}

/// Read side of the simulated enclosure.
#[derive(Debug, Clone)]
pub struct SimulatedSensors {
    plant: SimulatedPlant,
}

impl Sensors for SimulatedSensors {
    fn read(
        &mut self,
        sensor: Sensor,
    ) -> std::result::Result<Reading, Box<dyn std::error::Error + Send + Sync>> {
        let reading = self.plant.lock()?.sample(sensor)?;
        tracing::trace!(sensor = %sensor, %reading, "simulated read");
        Ok(reading)
    }
}

/// Write side of the simulated enclosure.
#[derive(Debug, Clone)]
pub struct SimulatedActuators {
    plant: SimulatedPlant,
}

impl Actuators for SimulatedActuators {
    fn set(
        &mut self,
        actuator: Actuator,
        on: bool,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.plant.lock()?.outputs.insert(actuator, on);
        tracing::debug!(actuator = %actuator, on, "simulated write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valve_fills_the_tank() {
        let plant = SimulatedPlant::with_model(PlantModel {
            level: 0.9,
            ..PlantModel::default()
        });
        let mut sensors = plant.sensors();
        let mut actuators = plant.actuators();
        actuators.set(Actuator::WaterValve, true).unwrap();
        for _ in 0..5 {
            sensors.read(Sensor::WaterLevelBottom).unwrap();
        }
        assert_eq!(
            sensors.read(Sensor::WaterLevelTop).unwrap(),
            Reading::Digital(true)
        );
    }

    #[test]
    fn failing_sensor_reports_timeout() {
        let plant = SimulatedPlant::new();
        plant.fail_sensor(Sensor::Ph).unwrap();
        let err = plant.sensors().read(Sensor::Ph).expect_err("must fail");
        assert!(err.to_string().contains("timeout"));
        plant.heal_sensor(Sensor::Ph).unwrap();
        assert!(plant.sensors().read(Sensor::Ph).is_ok());
    }
}
