//! Edge-triggered daily schedule gate.
//!
//! A gate engages when wall-clock time enters `[on - grace, on]` and
//! disengages when it enters `[off, off + grace]`. Windows are evaluated
//! against yesterday, today and tomorrow so a grace period may cross midnight.
use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use crate::error::ControlError;

const DAY_SECS: i64 = 24 * 60 * 60;

/// A validated daily `[on, off)` schedule with a grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    on: NaiveTime,
    off: NaiveTime,
    grace: TimeDelta,
}

impl Schedule {
    pub fn new(on: NaiveTime, off: NaiveTime, grace_min: u32) -> Result<Self, ControlError> {
        if on >= off {
            return Err(ControlError::ScheduleConfig(format!(
                "on time {} must be earlier than off time {}",
                on.format("%H:%M"),
                off.format("%H:%M")
            )));
        }
        if grace_min == 0 {
            return Err(ControlError::ScheduleConfig(
                "grace period must be at least one minute".into(),
            ));
        }
        let grace = TimeDelta::minutes(i64::from(grace_min));
        let on_s = i64::from(on.num_seconds_from_midnight());
        let off_s = i64::from(off.num_seconds_from_midnight());
        let g = grace.num_seconds();
        // The disengage window must end before the next day's engage window opens.
        if off_s + g >= on_s + DAY_SECS - g {
            return Err(ControlError::ScheduleConfig(format!(
                "grace of {grace_min} min makes the off window at {} overlap the next on window at {}",
                off.format("%H:%M"),
                on.format("%H:%M")
            )));
        }
        Ok(Self { on, off, grace })
    }

    pub fn on(&self) -> NaiveTime {
        self.on
    }

    pub fn off(&self) -> NaiveTime {
        self.off
    }

    pub fn grace(&self) -> TimeDelta {
        self.grace
    }

    fn within(now: NaiveDateTime, anchor: NaiveTime, before: TimeDelta, after: TimeDelta) -> bool {
        let today = now.date();
        [today.pred_opt(), Some(today), today.succ_opt()]
            .into_iter()
            .flatten()
            .any(|d| {
                let at = d.and_time(anchor);
                at - before <= now && now <= at + after
            })
    }

    /// `now` lies in `[on - grace, on]`.
    pub fn in_engage_window(&self, now: NaiveDateTime) -> bool {
        Self::within(now, self.on, self.grace, TimeDelta::zero())
    }

    /// `now` lies in `[off, off + grace]`.
    pub fn in_disengage_window(&self, now: NaiveDateTime) -> bool {
        Self::within(now, self.off, TimeDelta::zero(), self.grace)
    }

    /// `now` lies strictly between `on` and `off` of the same day.
    pub fn is_active_period(&self, now: NaiveDateTime) -> bool {
        let t = now.time();
        self.on < t && t < self.off
    }
}

/// Transition emitted by a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    TurnOn,
    TurnOff,
}

#[derive(Debug, Clone)]
pub struct ScheduleGate {
    schedule: Schedule,
    engaged: bool,
}

impl ScheduleGate {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            engaged: false,
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Emit at most one edge; repeated calls inside the same state emit nothing.
    pub fn evaluate(&mut self, now: NaiveDateTime) -> Option<Edge> {
        if !self.engaged && self.schedule.in_engage_window(now) {
            self.engaged = true;
            Some(Edge::TurnOn)
        } else if self.engaged && self.schedule.in_disengage_window(now) {
            self.engaged = false;
            Some(Edge::TurnOff)
        } else {
            None
        }
    }

    /// Engage without an edge when starting between `on` and `off`.
    ///
    /// Returns true when the gate was engaged by this call.
    pub fn resume(&mut self, now: NaiveDateTime) -> bool {
        if !self.engaged && self.schedule.is_active_period(now) {
            self.engaged = true;
            return true;
        }
        false
    }
}
