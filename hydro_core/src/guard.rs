//! Once-per-day dosing guard.
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};

use crate::error::ControlError;

/// Minimum spacing between two recorded doses of the same line.
pub fn min_dose_spacing() -> TimeDelta {
    TimeDelta::hours(24)
}

/// Permits a dose inside an inclusive daily window, at most once per 24 h.
#[derive(Debug, Clone)]
pub struct DosingGuard {
    start: NaiveTime,
    end: NaiveTime,
    last_dose: Option<NaiveDateTime>,
}

impl DosingGuard {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ControlError> {
        if start >= end {
            return Err(ControlError::ScheduleConfig(format!(
                "dosing window start {} must be earlier than end {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        Ok(Self {
            start,
            end,
            last_dose: None,
        })
    }

    /// Inclusive on both ends, independent of second alignment.
    pub fn in_window(&self, now: NaiveDateTime) -> bool {
        let t = now.time();
        self.start <= t && t <= self.end
    }

    pub fn permits(&self, now: NaiveDateTime) -> bool {
        self.in_window(now)
            && self
                .last_dose
                .is_none_or(|last| now - last > min_dose_spacing())
    }

    /// Record a completed dose. Call only after the pumps have finished.
    pub fn record(&mut self, at: NaiveDateTime) {
        self.last_dose = Some(at);
    }

    pub fn last_dose(&self) -> Option<NaiveDateTime> {
        self.last_dose
    }
}
