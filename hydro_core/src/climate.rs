//! Vent control from averaged air temperature and humidity.
use hydro_traits::{Actuator, Sensor};

use crate::config::ClimateCfg;
use crate::controller::TickIo;
use crate::window::SignalWindow;

#[derive(Debug, Clone, Default)]
pub struct ClimateState {
    pub temperature: SignalWindow<f64>,
    pub humidity: SignalWindow<f64>,
    /// Desired vent state; the bank holds what was actually written.
    pub vent_on: bool,
}

/// Open above either high threshold, close only below both low thresholds.
///
/// Each signal runs its own regulator seeded with the current vent state; the
/// vent stays open while either regulator wants it open.
pub fn vent_decision(cfg: &ClimateCfg, current: bool, avg_temp: f64, avg_humidity: f64) -> bool {
    let by_temp = cfg.temperature.next_state(current, avg_temp);
    let by_humidity = cfg.humidity.next_state(current, avg_humidity);
    by_temp || by_humidity
}

pub fn tick(st: &mut ClimateState, cfg: &ClimateCfg, io: &mut TickIo<'_>) {
    if let Some(t) = io.read_analog(Sensor::AirTemperature) {
        st.temperature.push(t);
    }
    if let Some(h) = io.read_analog(Sensor::AirHumidity) {
        st.humidity.push(h);
    }
    let (avg_temp, avg_humidity) = match (st.temperature.mean(), st.humidity.mean()) {
        (Ok(t), Ok(h)) => (t, h),
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!(error = %e, "climate window filling");
            return;
        }
    };
    io.report.avg_air_temp = Some(avg_temp);
    io.report.avg_humidity = Some(avg_humidity);

    let next = vent_decision(cfg, st.vent_on, avg_temp, avg_humidity);
    if next != st.vent_on {
        tracing::info!(avg_temp, avg_humidity, vent = next, "climate threshold crossed");
    }
    st.vent_on = next;
    io.command(Actuator::Vent, next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hysteresis::Band;

    fn cfg() -> ClimateCfg {
        ClimateCfg {
            temperature: Band::new(25.0, 30.0).unwrap(),
            humidity: Band::new(40.0, 80.0).unwrap(),
        }
    }

    #[test]
    fn either_signal_opens_the_vent() {
        assert!(vent_decision(&cfg(), false, 31.0, 50.0));
        assert!(vent_decision(&cfg(), false, 26.0, 85.0));
        assert!(vent_decision(&cfg(), false, 31.0, 85.0));
    }

    #[test]
    fn both_signals_must_drop_to_close() {
        assert!(vent_decision(&cfg(), true, 24.0, 50.0));
        assert!(!vent_decision(&cfg(), true, 24.0, 39.0));
        assert!(!vent_decision(&cfg(), false, 27.0, 60.0));
    }

    #[test]
    fn thresholds_themselves_hold_the_current_state() {
        assert!(!vent_decision(&cfg(), false, 30.0, 80.0));
        assert!(vent_decision(&cfg(), true, 25.0, 40.0));
        assert!(vent_decision(&cfg(), true, 24.0, 40.0));
    }
}
