//! Fixed-cadence control loop.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use hydro_traits::{Clock, WallClock};

use crate::controller::Controller;
use crate::error::Result;
use crate::status::TickReport;

/// Granularity at which the loop checks the shutdown flag while waiting.
const WAIT_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub tick: Duration,
    /// Stop after this many ticks; `None` runs until shutdown.
    pub max_ticks: Option<u64>,
    /// Engage schedules already inside their active period at startup.
    pub resume_schedules: bool,
}

impl RunOptions {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            max_ticks: None,
            resume_schedules: true,
        }
    }
}

/// Totals over one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub commands: u64,
    pub doses_started: u64,
    pub doses_completed: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    /// Ticks whose work ran past the next deadline.
    pub overruns: u64,
}

impl LoopStats {
    pub fn absorb(&mut self, r: &TickReport) {
        self.ticks += 1;
        self.commands += r.commands.len() as u64;
        self.doses_started += r.doses_started.len() as u64;
        self.doses_completed += r.doses_finished.iter().filter(|d| d.completed).count() as u64;
        self.read_errors += u64::from(r.read_errors);
        self.write_errors += u64::from(r.write_errors);
    }
}

/// Wait until `deadline`, returning early once `stop` is raised.
fn sleep_until(clock: &dyn Clock, deadline: Instant, stop: &AtomicBool) {
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let now = clock.now();
        if now >= deadline {
            return;
        }
        clock.sleep(WAIT_SLICE.min(deadline - now));
    }
}

/// Tick `controller` every `opts.tick` until `stop` is raised or `max_ticks`
/// is reached, then run the shutdown fail-safe.
///
/// Deadlines are absolute so a slow tick does not shift later ones; a tick
/// that overruns its slot is counted and the schedule restarts from now.
pub fn run(
    controller: &mut Controller,
    clock: &dyn Clock,
    wall: &dyn WallClock,
    opts: RunOptions,
    stop: &AtomicBool,
) -> Result<LoopStats> {
    if opts.tick.is_zero() {
        eyre::bail!("tick must be > 0");
    }
    let mut stats = LoopStats::default();
    if opts.resume_schedules {
        controller.resume_schedules(wall.now());
    }
    tracing::info!(
        tick_ms = opts.tick.as_millis() as u64,
        max_ticks = ?opts.max_ticks,
        "control loop started"
    );

    let mut next = clock.now();
    loop {
        if stop.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        if let Some(max) = opts.max_ticks
            && stats.ticks >= max
        {
            break;
        }

        let report = controller.tick(wall.now());
        stats.absorb(&report);

        next += opts.tick;
        let now = clock.now();
        if now > next {
            stats.overruns += 1;
            tracing::warn!(
                late_ms = (now - next).as_millis() as u64,
                tick = report.tick,
                "tick overran its slot"
            );
            next = now;
        } else {
            sleep_until(clock, next, stop);
        }
    }

    let shutdown = controller.shutdown();
    tracing::info!(?stats, "control loop stopped");
    shutdown?;
    Ok(stats)
}
