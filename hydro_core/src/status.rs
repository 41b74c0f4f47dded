//! Per-tick report returned by the controller.

use chrono::NaiveDateTime;
use hydro_traits::Actuator;

use crate::circulation::Phase;
use crate::worker::{DoseKind, DoseReport};

/// One actuator write issued during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub actuator: Actuator,
    pub on: bool,
}

/// What happened during a single tick of the control loop.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub at: NaiveDateTime,
    pub tick: u64,
    /// Actuator state changes, in the order they were written.
    pub commands: Vec<Command>,
    pub doses_started: Vec<DoseKind>,
    pub doses_finished: Vec<DoseReport>,
    pub read_errors: u32,
    pub write_errors: u32,
    pub avg_air_temp: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub avg_ph: Option<f64>,
    pub avg_ec: Option<f64>,
    pub phase: Phase,
}

impl TickReport {
    pub fn new(at: NaiveDateTime, tick: u64) -> Self {
        Self {
            at,
            tick,
            commands: Vec::new(),
            doses_started: Vec::new(),
            doses_finished: Vec::new(),
            read_errors: 0,
            write_errors: 0,
            avg_air_temp: None,
            avg_humidity: None,
            avg_ph: None,
            avg_ec: None,
            phase: Phase::Idle,
        }
    }

    /// Last state written to `actuator` during this tick.
    pub fn commanded(&self, actuator: Actuator) -> Option<bool> {
        self.commands
            .iter()
            .rev()
            .find(|c| c.actuator == actuator)
            .map(|c| c.on)
    }
}
