use std::time::Duration;

use hydro_core::error::BuildError;
use hydro_core::mocks::{RecordingActuators, ScriptedSensors};
use hydro_core::{Controller, ControllerCfg, ProbeCalibration};
use rstest::rstest;

fn cfg() -> ControllerCfg {
    ControllerCfg::defaults_with(ProbeCalibration::new(4.0, 7.0, 1.413).unwrap()).unwrap()
}

#[rstest]
fn missing_sensors_yields_typed_build_error() {
    let err = Controller::builder()
        .with_actuators(RecordingActuators::new())
        .with_config(cfg())
        .try_build()
        .expect_err("should fail with MissingSensors");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSensors) => {}
        other => panic!("expected MissingSensors, got: {other:?}"),
    }
}

#[rstest]
fn missing_actuators_yields_typed_build_error() {
    let err = Controller::builder()
        .with_sensors(ScriptedSensors::new())
        .with_config(cfg())
        .try_build()
        .expect_err("should fail with MissingActuators");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingActuators)
    ));
}

#[rstest]
fn missing_config_yields_typed_build_error() {
    let err = Controller::builder()
        .with_sensors(ScriptedSensors::new())
        .with_actuators(RecordingActuators::new())
        .try_build()
        .expect_err("should fail with MissingConfig");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingConfig)
    ));
}

#[rstest]
#[case::zero(Duration::ZERO, "tick must be > 0")]
#[case::longer_than_grace(Duration::from_secs(300), "grace period")]
fn bad_tick_is_rejected(#[case] tick: Duration, #[case] needle: &str) {
    let mut c = cfg();
    c.tick = tick;
    let err = Controller::builder()
        .with_sensors(ScriptedSensors::new())
        .with_actuators(RecordingActuators::new())
        .with_config(c)
        .try_build()
        .expect_err("tick must be rejected");
    let msg = err.to_string();
    assert!(msg.contains(needle), "unexpected error: {msg}");
}

#[rstest]
fn tick_must_fit_the_nutrient_window() {
    let mut c = cfg();
    c.ec.window_end = c.ec.window_start + chrono::TimeDelta::seconds(3);
    let err = Controller::builder()
        .with_sensors(ScriptedSensors::new())
        .with_actuators(RecordingActuators::new())
        .with_config(c)
        .try_build()
        .expect_err("window shorter than a tick");
    assert!(err.to_string().contains("nutrient dosing window"));
}

#[rstest]
fn complete_builder_builds() {
    let ctrl = Controller::builder()
        .with_sensors(ScriptedSensors::new())
        .with_actuators(RecordingActuators::new())
        .with_config(cfg())
        .build()
        .expect("valid controller");
    assert_eq!(ctrl.state().ticks, 0);
    assert_eq!(ctrl.doses_running(), 0);
}
