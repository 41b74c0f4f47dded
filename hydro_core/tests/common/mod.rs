#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use hydro_core::mocks::{RecordingActuators, ScriptedSensors};
use hydro_core::{Controller, ControllerCfg, ProbeCalibration, TickReport};
use hydro_traits::{Actuators, Sensor};
use hydro_traits::clock::test_clock::TestClock;

/// Calibration under which probe volts read directly as pH and as mS/cm at 25 °C.
pub fn identity_calibration() -> ProbeCalibration {
    ProbeCalibration::new(4.0, 7.0, 1.413).unwrap()
}

pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

pub struct Rig {
    pub ctrl: Controller,
    pub sensors: ScriptedSensors,
    pub outputs: RecordingActuators,
    pub clock: TestClock,
}

/// Scripted sensors reporting a healthy, in-band enclosure.
pub fn healthy_sensors() -> ScriptedSensors {
    let sensors = ScriptedSensors::new();
    sensors
        .set_analog(Sensor::AirTemperature, 27.0)
        .set_analog(Sensor::AirHumidity, 60.0)
        .set_analog(Sensor::WaterTemperature, 25.0)
        .set_analog(Sensor::Ph, 6.5)
        .set_analog(Sensor::Ec, 1.5)
        .set_digital(Sensor::WaterLevelBottom, false)
        .set_digital(Sensor::WaterLevelTop, false)
        .set_digital(Sensor::Door, false)
        .set_digital(Sensor::Button, false);
    sensors
}

/// Controller with stock config and identity calibration.
pub fn controller(
    sensors: &ScriptedSensors,
    outputs: impl Actuators + Send + 'static,
    clock: &TestClock,
) -> Controller {
    Controller::builder()
        .with_sensors(sensors.clone())
        .with_actuators(outputs)
        .with_config(ControllerCfg::defaults_with(identity_calibration()).unwrap())
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap()
}

/// Controller over healthy scripted sensors and recording outputs.
pub fn rig() -> Rig {
    let sensors = healthy_sensors();
    let outputs = RecordingActuators::new();
    let clock = TestClock::new();
    let ctrl = controller(&sensors, outputs.clone(), &clock);
    Rig {
        ctrl,
        sensors,
        outputs,
        clock,
    }
}

/// `n` ticks, 5 s apart, the first one 5 s after `start`.
pub fn run_ticks(ctrl: &mut Controller, start: NaiveDateTime, n: u32) -> Vec<TickReport> {
    (1..=n)
        .map(|k| ctrl.tick(start + TimeDelta::seconds(5 * i64::from(k))))
        .collect()
}
