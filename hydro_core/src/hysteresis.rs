//! Two-threshold (bang-bang) regulation shared by the vent and pH dosing.
use crate::error::ControlError;

/// Where an average sits relative to a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Below,
    Within,
    Above,
}

/// A `[low, high]` band; values strictly outside it trigger action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    low: f64,
    high: f64,
}

impl Band {
    pub fn new(low: f64, high: f64) -> Result<Self, ControlError> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(ControlError::State(format!(
                "band requires finite low < high, got [{low}, {high}]"
            )));
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn classify(&self, avg: f64) -> Zone {
        if avg > self.high {
            Zone::Above
        } else if avg < self.low {
            Zone::Below
        } else {
            Zone::Within
        }
    }

    /// On above `high`, off below `low`, otherwise keep `current`.
    pub fn next_state(&self, current: bool, avg: f64) -> bool {
        match self.classify(avg) {
            Zone::Above => true,
            Zone::Below => false,
            Zone::Within => current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_inside_the_band() {
        let b = Band::new(25.0, 30.0).unwrap();
        assert!(!b.next_state(false, 27.0));
        assert!(b.next_state(true, 27.0));
        assert!(b.next_state(false, 30.1));
        assert!(!b.next_state(true, 24.9));
        // Thresholds themselves are inside the band.
        assert!(!b.next_state(false, 30.0));
        assert!(b.next_state(true, 25.0));
    }

    #[test]
    fn rejects_inverted_band() {
        assert!(Band::new(7.5, 5.5).is_err());
        assert!(Band::new(f64::NAN, 1.0).is_err());
    }
}
