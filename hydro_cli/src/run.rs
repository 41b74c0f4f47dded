//! Config mapping, hardware assembly, the control loop and self-check.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use hydro_config::Config;
use hydro_core::{Controller, ControllerCfg, LoopStats, RunOptions};
use hydro_traits::{Actuators, LocalWallClock, MonotonicClock, Sensor, Sensors};

type Hardware = (Box<dyn Sensors + Send>, Box<dyn Actuators + Send>);

/// Map the TOML config onto the core runtime config.
///
/// Typed conversions run before range validation so calibration and schedule
/// problems surface as their own error kinds.
pub fn controller_cfg(cfg: &Config) -> eyre::Result<ControllerCfg> {
    let core = ControllerCfg::try_from(cfg).map_err(eyre::Report::new)?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(core)
}

#[cfg(feature = "hardware")]
pub fn open_hardware(cfg: &Config) -> eyre::Result<Hardware> {
    use hydro_hardware::{ActuatorPins, BusConfig, RpiActuators, RpiSensors, SensorPins};

    let p = &cfg.pins;
    let actuators = RpiActuators::new(&ActuatorPins {
        water_pump: p.water_pump,
        water_valve: p.water_valve,
        buzzer: p.buzzer,
        light: p.light.clone(),
        vent: p.vent,
        green_led: p.green_led,
        red_led: p.red_led,
        blue_led: p.blue_led,
        water_led: p.water_led,
        fertilization_pump_a: p.fertilization_pump_a,
        fertilization_pump_b: p.fertilization_pump_b,
        ph_up_pump: p.ph_up_pump,
        ph_down_pump: p.ph_down_pump,
    })
    .wrap_err("open actuator pins")?;
    let hw = &cfg.hardware;
    let sensors = RpiSensors::new(
        SensorPins {
            water_level_bottom: p.water_level_bottom,
            water_level_top: p.water_level_top,
            door: p.door,
            button: p.button,
        },
        &BusConfig {
            i2c_bus: hw.i2c_bus,
            ph_adc_address: hw.ph_adc_address,
            ec_adc_address: hw.ec_adc_address,
            conversion_timeout: Duration::from_millis(hw.conversion_timeout_ms),
            w1_device: hw.w1_device.clone(),
            iio_device: hw.iio_device.clone(),
        },
    )
    .wrap_err("open sensors")?;
    tracing::info!(backend = "rpi", "hardware ready");
    Ok((Box::new(sensors), Box::new(actuators)))
}

#[cfg(not(feature = "hardware"))]
pub fn open_hardware(_cfg: &Config) -> eyre::Result<Hardware> {
    let plant = hydro_hardware::SimulatedPlant::new();
    tracing::info!(backend = "sim", "hardware ready");
    Ok((Box::new(plant.sensors()), Box::new(plant.actuators())))
}

pub fn run_loop(
    cfg: &Config,
    max_ticks: Option<u64>,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<LoopStats> {
    let core_cfg = controller_cfg(cfg)?;
    let (sensors, actuators) = open_hardware(cfg)?;
    let mut controller = Controller::builder()
        .with_sensors(sensors)
        .with_actuators(actuators)
        .with_config(core_cfg)
        .build()?;

    let opts = RunOptions {
        max_ticks,
        ..RunOptions::new(core_cfg.tick)
    };
    hydro_core::run(
        &mut controller,
        &MonotonicClock::new(),
        &LocalWallClock,
        opts,
        &shutdown,
    )
}

/// One line per sensor: its value, or why it could not be read.
pub fn self_check(cfg: &Config) -> eyre::Result<Vec<(Sensor, Result<String, String>)>> {
    let (mut sensors, _actuators) = open_hardware(cfg)?;
    Ok(Sensor::ALL
        .into_iter()
        .map(|s| {
            let r = sensors
                .read(s)
                .map(|v| v.to_string())
                .map_err(|e| e.to_string());
            (s, r)
        })
        .collect())
}

pub fn print_stats(stats: &LoopStats, tick: Duration) {
    eprintln!("\n--- Hydro Stats ---");
    eprintln!("Ticks: {}", stats.ticks);
    eprintln!("Tick interval (s): {}", tick.as_secs());
    eprintln!("Commands issued: {}", stats.commands);
    eprintln!(
        "Doses started/completed: {} / {}",
        stats.doses_started, stats.doses_completed
    );
    eprintln!(
        "Read/write errors: {} / {}",
        stats.read_errors, stats.write_errors
    );
    eprintln!("Overruns (> interval): {}", stats.overruns);
    eprintln!("-------------------\n");
}

pub fn stats_json(stats: &LoopStats) -> serde_json::Value {
    serde_json::json!({
        "ticks": stats.ticks,
        "commands": stats.commands,
        "doses_started": stats.doses_started,
        "doses_completed": stats.doses_completed,
        "read_errors": stats.read_errors,
        "write_errors": stats.write_errors,
        "overruns": stats.overruns,
    })
}
