#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Closed-loop enclosure control (hardware-agnostic).
//!
//! This crate holds the control policies for a hydroponic grow box. All
//! hardware interactions go through the `hydro_traits::Sensors` and
//! `hydro_traits::Actuators` traits.
//!
//! ## Architecture
//!
//! - **Signal windows**: 5-sample averaging and debouncing (`window`)
//! - **Regulation**: two-threshold bands for the vent and pH (`hysteresis`)
//! - **Schedules**: edge-triggered daily on/off gates (`schedule`)
//! - **Dosing**: once-per-day nutrient guard (`guard`) and timed pump jobs on
//!   worker threads (`worker`)
//! - **Policies**: `climate`, `chemistry`, `lighting`, `circulation`,
//!   `indicators`, orchestrated per tick by `Controller`
//! - **Loop**: fixed-cadence runner with shutdown fail-safe (`runner`)
//!
//! Time of day comes from a `WallClock`; pump durations and loop pacing from
//! a monotonic `Clock`, so tests can drive both deterministically.

pub mod actuators;
pub mod builder;
pub mod calibration;
pub mod chemistry;
pub mod circulation;
pub mod climate;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod guard;
pub mod hw_error;
pub mod hysteresis;
pub mod indicators;
pub mod lighting;
pub mod mocks;
pub mod runner;
pub mod schedule;
pub mod status;
pub mod util;
pub mod window;
pub mod worker;

pub use actuators::ActuatorBank;
pub use builder::{ControllerBuilder, Missing, Set};
pub use calibration::ProbeCalibration;
pub use circulation::Phase;
pub use config::{CirculationCfg, ClimateCfg, ControllerCfg, EcCfg, PhCfg};
pub use controller::{Controller, ControllerState, TickIo};
pub use error::{BuildError, ControlError, Report, Result};
pub use guard::DosingGuard;
pub use hysteresis::{Band, Zone};
pub use runner::{LoopStats, RunOptions, run};
pub use schedule::{Edge, Schedule, ScheduleGate};
pub use status::{Command, TickReport};
pub use window::{SignalWindow, WINDOW_LEN};
pub use worker::{DoseJob, DoseKind, DoseReport, PumpRunner};
