//! Tick orchestration.
//!
//! One `tick` reads the sensors each policy needs, runs the policies in a
//! fixed order and writes only the outputs whose commanded state changed:
//!
//! 1. fold in finished pump jobs, retry a dosing pump left on
//! 2. climate (vent)
//! 3. chemistry (pH and nutrients), only while the circulation pump runs
//! 4. lighting
//! 5. circulation (valve and pump)
//! 6. indicators (LEDs, buzzer, door and button)
use std::sync::Arc;

use chrono::NaiveDateTime;
use hydro_traits::{Actuator, Clock, Sensor, Sensors};

use crate::actuators::ActuatorBank;
use crate::builder::{ControllerBuilder, Missing};
use crate::chemistry::{self, ChemistryCtx, ChemistryState};
use crate::circulation::{self, CirculationState};
use crate::climate::{self, ClimateState};
use crate::config::ControllerCfg;
use crate::error::ControlError;
use crate::guard::DosingGuard;
use crate::hw_error::map_hw_error;
use crate::hysteresis::Zone;
use crate::indicators::{self, IndicatorState, Panel};
use crate::lighting::{self, LightingState};
use crate::schedule::ScheduleGate;
use crate::status::{Command, TickReport};
use crate::worker::{DoseReport, PumpRunner};

/// Per-tick view of the hardware handed to each policy.
pub struct TickIo<'a> {
    pub sensors: &'a mut dyn Sensors,
    pub bank: &'a ActuatorBank,
    pub report: &'a mut TickReport,
    pub now: NaiveDateTime,
}

impl TickIo<'_> {
    /// Read an analog sensor. Failures are logged and counted, never retried.
    pub fn read_analog(&mut self, sensor: Sensor) -> Option<f64> {
        self.read(sensor).map(|r| r.as_f64())
    }

    pub fn read_digital(&mut self, sensor: Sensor) -> Option<bool> {
        self.read(sensor).map(|r| r.as_bool())
    }

    fn read(&mut self, sensor: Sensor) -> Option<hydro_traits::Reading> {
        match self.sensors.read(sensor) {
            Ok(r) => Some(r),
            Err(e) => {
                let err = map_hw_error(e.as_ref());
                tracing::warn!(sensor = %sensor, error = %err, "sensor read failed");
                self.report.read_errors += 1;
                None
            }
        }
    }

    /// Command an output; written only when it differs from the last success.
    pub fn command(&mut self, actuator: Actuator, on: bool) {
        match self.bank.command(actuator, on) {
            Ok(true) => self.report.commands.push(Command { actuator, on }),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(actuator = %actuator, on, error = %e, "actuator write failed");
                self.report.write_errors += 1;
            }
        }
    }
}

/// All policy state carried between ticks.
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub climate: ClimateState,
    pub chemistry: ChemistryState,
    pub lighting: LightingState,
    pub circulation: CirculationState,
    pub indicators: IndicatorState,
    pub ticks: u64,
}

impl ControllerState {
    pub fn new(cfg: &ControllerCfg) -> Result<Self, ControlError> {
        Ok(Self {
            climate: ClimateState::default(),
            chemistry: ChemistryState::new(DosingGuard::new(
                cfg.ec.window_start,
                cfg.ec.window_end,
            )?),
            lighting: LightingState::new(cfg.lighting),
            circulation: CirculationState::new(ScheduleGate::new(cfg.circulation.schedule)),
            indicators: IndicatorState::default(),
            ticks: 0,
        })
    }
}

pub struct Controller {
    pub(crate) sensors: Box<dyn Sensors + Send>,
    pub(crate) bank: ActuatorBank,
    pub(crate) runner: PumpRunner,
    pub(crate) cfg: ControllerCfg,
    pub(crate) state: ControllerState,
    pub(crate) running: bool,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("ticks", &self.state.ticks)
            .field("phase", &self.state.circulation.phase)
            .field("doses_running", &self.runner.running())
            .finish()
    }
}

impl Controller {
    pub fn builder() -> ControllerBuilder<Missing, Missing, Missing> {
        ControllerBuilder::default()
    }

    pub(crate) fn new(
        sensors: Box<dyn Sensors + Send>,
        bank: ActuatorBank,
        clock: Arc<dyn Clock + Send + Sync>,
        cfg: ControllerCfg,
    ) -> Result<Self, ControlError> {
        Ok(Self {
            sensors,
            runner: PumpRunner::new(bank.clone(), clock),
            bank,
            state: ControllerState::new(&cfg)?,
            cfg,
            running: true,
        })
    }

    pub fn config(&self) -> &ControllerCfg {
        &self.cfg
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn bank(&self) -> &ActuatorBank {
        &self.bank
    }

    /// Pump jobs whose threads are still running.
    pub fn doses_running(&self) -> usize {
        self.runner.running()
    }

    /// Engage schedules whose active period already started before boot.
    pub fn resume_schedules(&mut self, now: NaiveDateTime) {
        if self.state.lighting.gate.resume(now) {
            tracing::info!(at = %now.time(), "inside light period at startup, light on");
        }
        if self.state.circulation.gate.resume(now) {
            tracing::info!(at = %now.time(), "inside circulation period at startup");
        }
    }

    /// Run one control iteration at wall-clock time `now`.
    pub fn tick(&mut self, now: NaiveDateTime) -> TickReport {
        let mut report = TickReport::new(now, self.state.ticks);
        for done in self.runner.drain() {
            chemistry::apply_report(&mut self.state.chemistry, &done);
            report.doses_finished.push(done);
        }

        let cfg = self.cfg;
        let st = &mut self.state;
        let mut io = TickIo {
            sensors: self.sensors.as_mut(),
            bank: &self.bank,
            report: &mut report,
            now,
        };

        chemistry::retry_stuck_pump(&mut st.chemistry, &mut io);
        climate::tick(&mut st.climate, &cfg.climate, &mut io);
        if st.circulation.pump_on() {
            let ctx = ChemistryCtx {
                ph: &cfg.ph,
                ec: &cfg.ec,
                calibration: &cfg.calibration,
                runner: &mut self.runner,
            };
            chemistry::tick(&mut st.chemistry, ctx, &mut io);
        }
        lighting::tick(&mut st.lighting, &mut io);
        circulation::tick(&mut st.circulation, &cfg.circulation, &mut io);

        let panel = Panel {
            running: self.running,
            ph_out_of_band: st
                .chemistry
                .last_avg_ph
                .is_some_and(|ph| cfg.ph.band.classify(ph) != Zone::Within),
            ec_out_of_band: st
                .chemistry
                .last_avg_ec
                .is_some_and(|ec| cfg.ec.band.classify(ec) != Zone::Within),
            low_water: st.circulation.low_water(),
            alarm: st.circulation.low_water_alarm || st.chemistry.stuck_pump.is_some(),
        };
        indicators::tick(&mut st.indicators, panel, &mut io);

        st.ticks += 1;
        tracing::debug!(
            tick = report.tick,
            commands = report.commands.len(),
            read_errors = report.read_errors,
            phase = ?report.phase,
            "tick complete"
        );
        report
    }

    /// Block until running pump jobs finish, then fold in their reports.
    pub fn wait_for_workers(&mut self) -> Vec<DoseReport> {
        self.runner.join_all();
        let done = self.runner.drain();
        for r in &done {
            chemistry::apply_report(&mut self.state.chemistry, r);
        }
        done
    }

    /// Stop pump jobs and force every dosing pump and the running LED off.
    ///
    /// Every output is attempted; the first failure is returned.
    pub fn shutdown(&mut self) -> Result<(), ControlError> {
        self.running = false;
        self.runner.shutdown();
        for r in self.runner.drain() {
            chemistry::apply_report(&mut self.state.chemistry, &r);
        }
        let mut first_err = None;
        for a in Actuator::DOSING_PUMPS.into_iter().chain([Actuator::GreenLed]) {
            if let Err(e) = self.bank.write(a, false) {
                tracing::error!(actuator = %a, error = %e, "fail-safe write failed");
                first_err.get_or_insert(e);
            }
        }
        tracing::info!(ticks = self.state.ticks, "controller shut down");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
