//! Small numeric and time helpers shared by the policies.
use std::time::Duration;

use chrono::TimeDelta;

/// Round to three decimal places, the resolution reported in logs and averages.
#[inline]
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Convert a std duration into a chrono delta, saturating at `TimeDelta::MAX`.
#[inline]
pub fn to_time_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}
