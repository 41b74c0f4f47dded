//! pH correction and daily nutrient (EC) dosing.
//!
//! Only evaluated while the circulation pump runs. Doses are submitted to the
//! `PumpRunner`; their completion is folded back in by `apply_report` at the
//! start of the next tick.
use chrono::NaiveDateTime;
use hydro_traits::{Actuator, Sensor};

use crate::calibration::ProbeCalibration;
use crate::config::{EcCfg, PhCfg};
use crate::controller::TickIo;
use crate::guard::DosingGuard;
use crate::hysteresis::Zone;
use crate::status::Command;
use crate::worker::{DoseJob, DoseKind, DoseReport, PumpRunner};
use crate::window::SignalWindow;

#[derive(Debug, Clone)]
pub struct ChemistryState {
    pub ph: SignalWindow<f64>,
    pub ec: SignalWindow<f64>,
    /// Last good water temperature, for EC compensation.
    pub water_temp: Option<f64>,
    pub guard: DosingGuard,
    pub ph_in_flight: Option<DoseKind>,
    pub nutrients_in_flight: bool,
    pub last_ph_dose_at: Option<NaiveDateTime>,
    pub last_avg_ph: Option<f64>,
    pub last_avg_ec: Option<f64>,
    /// Dosing pump a job failed to switch off; its dose stays in flight
    /// until a retried off write succeeds.
    pub stuck_pump: Option<(DoseKind, Actuator)>,
}

impl ChemistryState {
    pub fn new(guard: DosingGuard) -> Self {
        Self {
            ph: SignalWindow::new(),
            ec: SignalWindow::new(),
            water_temp: None,
            guard,
            ph_in_flight: None,
            nutrients_in_flight: false,
            last_ph_dose_at: None,
            last_avg_ph: None,
            last_avg_ec: None,
            stuck_pump: None,
        }
    }
}

pub struct ChemistryCtx<'a> {
    pub ph: &'a PhCfg,
    pub ec: &'a EcCfg,
    pub calibration: &'a ProbeCalibration,
    pub runner: &'a mut PumpRunner,
}

pub fn tick(st: &mut ChemistryState, ctx: ChemistryCtx<'_>, io: &mut TickIo<'_>) {
    if let Some(t) = io.read_analog(Sensor::WaterTemperature) {
        st.water_temp = Some(t);
    }
    if let Some(v) = io.read_analog(Sensor::Ph) {
        st.ph.push(ctx.calibration.ph(v));
    }
    if let Some(v) = io.read_analog(Sensor::Ec) {
        st.ec.push(ctx.calibration.ec(v, st.water_temp));
    }
    regulate_ph(st, ctx.ph, ctx.runner, io);
    regulate_ec(st, ctx.ec, ctx.runner, io);
}

fn regulate_ph(st: &mut ChemistryState, cfg: &PhCfg, runner: &mut PumpRunner, io: &mut TickIo<'_>) {
    let avg = match st.ph.mean() {
        Ok(a) => a,
        Err(e) => {
            tracing::debug!(error = %e, "ph window filling");
            return;
        }
    };
    st.last_avg_ph = Some(avg);
    io.report.avg_ph = Some(avg);

    let kind = match cfg.band.classify(avg) {
        Zone::Above => DoseKind::PhDown,
        Zone::Below => DoseKind::PhUp,
        Zone::Within => return,
    };
    if let Some(running) = st.ph_in_flight {
        tracing::debug!(avg_ph = avg, running = %running, "ph dose still running");
        return;
    }
    if let Some(last) = st.last_ph_dose_at
        && io.now - last < cfg.settle
    {
        tracing::debug!(avg_ph = avg, "ph settling after last dose");
        return;
    }

    tracing::info!(avg_ph = avg, dose = %kind, "ph out of range, dosing");
    let job = DoseJob {
        kind,
        run_for: cfg.dose,
        started_at: io.now,
    };
    match runner.submit(job) {
        Ok(()) => {
            st.ph_in_flight = Some(kind);
            st.last_ph_dose_at = Some(io.now);
            io.report.doses_started.push(kind);
        }
        Err(e) => tracing::error!(dose = %kind, error = %e, "could not start ph dose"),
    }
}

fn regulate_ec(st: &mut ChemistryState, cfg: &EcCfg, runner: &mut PumpRunner, io: &mut TickIo<'_>) {
    let avg = match st.ec.mean() {
        Ok(a) => a,
        Err(e) => {
            tracing::debug!(error = %e, "ec window filling");
            return;
        }
    };
    st.last_avg_ec = Some(avg);
    io.report.avg_ec = Some(avg);

    if st.nutrients_in_flight || !st.guard.permits(io.now) {
        return;
    }
    if avg >= cfg.band.low() {
        tracing::debug!(avg_ec = avg, "ec sufficient, no nutrients needed");
        return;
    }

    tracing::info!(avg_ec = avg, "ec below minimum, dosing nutrients");
    let job = DoseJob {
        kind: DoseKind::Nutrients,
        run_for: cfg.nutrient_dose,
        started_at: io.now,
    };
    match runner.submit(job) {
        Ok(()) => {
            st.nutrients_in_flight = true;
            io.report.doses_started.push(DoseKind::Nutrients);
        }
        Err(e) => tracing::error!(error = %e, "could not start nutrient dose"),
    }
}

/// Fold a finished dose back into the policy state.
pub fn apply_report(st: &mut ChemistryState, report: &DoseReport) {
    if report.kind == DoseKind::Nutrients && report.dosed {
        // A partial dose still counts so pump A never runs twice in one day.
        st.guard.record(report.started_at);
    }
    if let Some(pump) = report.pump_left_on {
        tracing::error!(dose = %report.kind, pump = %pump, "dosing pump left on, dose kept in flight");
        st.stuck_pump = Some((report.kind, pump));
        return;
    }
    release(st, report.kind);
    match &report.error {
        None if report.completed => {
            tracing::info!(dose = %report.kind, "dose finished");
        }
        None => tracing::warn!(dose = %report.kind, "dose interrupted"),
        Some(e) => tracing::error!(dose = %report.kind, dosed = report.dosed, error = %e, "dose failed"),
    }
}

fn release(st: &mut ChemistryState, kind: DoseKind) {
    match kind {
        DoseKind::PhUp | DoseKind::PhDown => st.ph_in_flight = None,
        DoseKind::Nutrients => st.nutrients_in_flight = false,
    }
}

/// Retry switching off a pump a dose job left running. Runs every tick,
/// whether or not the circulation pump is on.
pub fn retry_stuck_pump(st: &mut ChemistryState, io: &mut TickIo<'_>) {
    let Some((kind, pump)) = st.stuck_pump else {
        return;
    };
    match io.bank.write(pump, false) {
        Ok(()) => {
            tracing::info!(pump = %pump, "stuck dosing pump switched off");
            io.report.commands.push(Command { actuator: pump, on: false });
            st.stuck_pump = None;
            release(st, kind);
        }
        Err(e) => {
            tracing::error!(pump = %pump, error = %e, "dosing pump still not responding");
            io.report.write_errors += 1;
        }
    }
}
