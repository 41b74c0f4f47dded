//! Timed pump runs on worker threads.
//!
//! Each submitted job owns one thread that switches its pumps on, waits the
//! configured duration on the injected `Clock`, switches them off and reports
//! back through a channel. The tick thread drains that channel at the start
//! of every tick, so only the tick thread mutates controller state.
//!
//! Jobs are not cancelled during normal operation. Dropping the runner (or
//! calling `shutdown`) asks running jobs to switch their pump off early and
//! joins their threads.
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::NaiveDateTime;
use crossbeam_channel as xch;
use hydro_traits::{Actuator, Clock};

use crate::actuators::ActuatorBank;
use crate::error::ControlError;

/// Granularity at which a running job checks for shutdown.
const SLEEP_SLICE: Duration = Duration::from_millis(100);
const OFF_RETRIES: usize = 3;

/// What a job doses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoseKind {
    PhUp,
    PhDown,
    /// Nutrient pump A, then pump B.
    Nutrients,
}

impl DoseKind {
    /// Pumps in the order they run.
    pub fn pumps(self) -> &'static [Actuator] {
        match self {
            DoseKind::PhUp => &[Actuator::PhUpPump],
            DoseKind::PhDown => &[Actuator::PhDownPump],
            DoseKind::Nutrients => &[Actuator::FertilizationPumpA, Actuator::FertilizationPumpB],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DoseKind::PhUp => "ph_up",
            DoseKind::PhDown => "ph_down",
            DoseKind::Nutrients => "nutrients",
        }
    }
}

impl fmt::Display for DoseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DoseJob {
    pub kind: DoseKind,
    /// Run time of each pump in the job.
    pub run_for: Duration,
    /// Wall-clock time the dose was permitted; recorded as the dose time.
    pub started_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoseReport {
    pub kind: DoseKind,
    pub started_at: NaiveDateTime,
    /// At least one pump was switched on.
    pub dosed: bool,
    /// Every pump ran for its full duration and was switched off.
    pub completed: bool,
    pub error: Option<String>,
    /// Pump that could not be switched off after every retry.
    pub pump_left_on: Option<Actuator>,
}

pub struct PumpRunner {
    bank: ActuatorBank,
    clock: Arc<dyn Clock + Send + Sync>,
    tx: xch::Sender<DoseReport>,
    rx: xch::Receiver<DoseReport>,
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl PumpRunner {
    pub fn new(bank: ActuatorBank, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let (tx, rx) = xch::unbounded();
        Self {
            bank,
            clock,
            tx,
            rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    /// Start `job` on its own thread. Returns immediately.
    pub fn submit(&mut self, job: DoseJob) -> Result<(), ControlError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(ControlError::State("pump runner is shut down".into()));
        }
        self.handles.retain(|h| !h.is_finished());
        let bank = self.bank.clone();
        let clock = self.clock.clone();
        let stop = self.shutdown.clone();
        let tx = self.tx.clone();
        let handle = std::thread::Builder::new()
            .name(format!("dose-{}", job.kind))
            .spawn(move || {
                let report = run_job(&bank, clock.as_ref(), &stop, job);
                // Receiver gone means the controller is being torn down.
                let _ = tx.send(report);
            })
            .map_err(|e| ControlError::State(format!("spawn dose worker: {e}")))?;
        self.handles.push(handle);
        tracing::debug!(kind = %job.kind, secs = job.run_for.as_secs_f64(), "dose job submitted");
        Ok(())
    }

    /// Reports of every job finished since the last call.
    pub fn drain(&self) -> Vec<DoseReport> {
        self.rx.try_iter().collect()
    }

    /// Number of job threads that have not finished yet.
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Block until every submitted job has finished.
    pub fn join_all(&mut self) {
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "dose worker panicked");
            }
        }
    }

    /// Ask running jobs to stop their pumps now and wait for them.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.join_all();
    }
}

impl Drop for PumpRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sleep up to `total`, returning false if `stop` was raised first.
fn sleep_unless_stopped(clock: &dyn Clock, total: Duration, stop: &AtomicBool) -> bool {
    let deadline = clock.now() + total;
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let now = clock.now();
        if now >= deadline {
            return true;
        }
        clock.sleep(SLEEP_SLICE.min(deadline - now));
    }
}

fn switch_off(bank: &ActuatorBank, clock: &dyn Clock, pump: Actuator) -> Result<(), ControlError> {
    let mut last = None;
    for attempt in 1..=OFF_RETRIES {
        match bank.write(pump, false) {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::error!(pump = %pump, attempt, error = %e, "failed to stop dosing pump");
                last = Some(e);
                clock.sleep(SLEEP_SLICE);
            }
        }
    }
    Err(last.unwrap_or_else(|| ControlError::State("pump off failed".into())))
}

fn run_job(bank: &ActuatorBank, clock: &dyn Clock, stop: &AtomicBool, job: DoseJob) -> DoseReport {
    let mut report = DoseReport {
        kind: job.kind,
        started_at: job.started_at,
        dosed: false,
        completed: false,
        error: None,
        pump_left_on: None,
    };
    for &pump in job.kind.pumps() {
        if stop.load(Ordering::Relaxed) {
            return report;
        }
        if let Err(e) = bank.write(pump, true) {
            tracing::error!(pump = %pump, error = %e, "failed to start dosing pump");
            report.error = Some(e.to_string());
            return report;
        }
        report.dosed = true;
        tracing::info!(pump = %pump, secs = job.run_for.as_secs_f64(), "dosing pump on");
        let ran_full = sleep_unless_stopped(clock, job.run_for, stop);
        if let Err(e) = switch_off(bank, clock, pump) {
            report.error = Some(e.to_string());
            report.pump_left_on = Some(pump);
            return report;
        }
        tracing::info!(pump = %pump, ran_full, "dosing pump off");
        if !ran_full {
            return report;
        }
    }
    report.completed = true;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FailingActuators, RecordingActuators};
    use chrono::NaiveDate;
    use hydro_traits::clock::test_clock::TestClock;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(15, 2, 0)
            .unwrap()
    }

    #[test]
    fn nutrients_run_a_then_b() {
        let rec = RecordingActuators::new();
        let clock = TestClock::new();
        let mut runner = PumpRunner::new(ActuatorBank::new(rec.clone()), Arc::new(clock.clone()));
        runner
            .submit(DoseJob {
                kind: DoseKind::Nutrients,
                run_for: Duration::from_secs(20),
                started_at: t0(),
            })
            .unwrap();
        runner.join_all();
        assert_eq!(
            rec.writes(),
            vec![
                (Actuator::FertilizationPumpA, true),
                (Actuator::FertilizationPumpA, false),
                (Actuator::FertilizationPumpB, true),
                (Actuator::FertilizationPumpB, false),
            ]
        );
        assert!(clock.elapsed() >= Duration::from_secs(40));
        let reports = runner.drain();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].completed && reports[0].dosed);
        assert_eq!(reports[0].started_at, t0());
    }

    #[test]
    fn failed_start_reports_no_dose() {
        let hal = FailingActuators::new();
        hal.fail(Actuator::PhDownPump);
        let mut runner = PumpRunner::new(ActuatorBank::new(hal), Arc::new(TestClock::new()));
        runner
            .submit(DoseJob {
                kind: DoseKind::PhDown,
                run_for: Duration::from_secs(10),
                started_at: t0(),
            })
            .unwrap();
        runner.join_all();
        let r = runner.drain().pop().unwrap();
        assert!(!r.dosed);
        assert!(!r.completed);
        assert!(r.error.unwrap().contains("not responding"));
    }

    #[test]
    fn pump_that_will_not_stop_is_reported() {
        let hal = FailingActuators::new();
        hal.stick_on(Actuator::PhUpPump);
        let mut runner = PumpRunner::new(ActuatorBank::new(hal.clone()), Arc::new(TestClock::new()));
        runner
            .submit(DoseJob {
                kind: DoseKind::PhUp,
                run_for: Duration::from_secs(10),
                started_at: t0(),
            })
            .unwrap();
        runner.join_all();
        let r = runner.drain().pop().unwrap();
        assert!(r.dosed);
        assert!(!r.completed);
        assert_eq!(r.pump_left_on, Some(Actuator::PhUpPump));
        assert_eq!(hal.recorder.writes(), vec![(Actuator::PhUpPump, true)]);
    }

    #[test]
    fn shutdown_refuses_new_jobs() {
        let mut runner = PumpRunner::new(
            ActuatorBank::new(RecordingActuators::new()),
            Arc::new(TestClock::new()),
        );
        runner.shutdown();
        let err = runner
            .submit(DoseJob {
                kind: DoseKind::PhUp,
                run_for: Duration::from_secs(10),
                started_at: t0(),
            })
            .unwrap_err();
        assert!(matches!(err, ControlError::State(_)));
    }
}
