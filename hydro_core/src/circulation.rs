//! Water level and circulation state machine.
//!
//! The state machine is the only writer of the water valve and the
//! circulation pump. A refill always takes precedence over scheduled
//! circulation.
//!
//! ```text
//!   Idle ──5×low──▶ Filling ──top full / fill time──▶ Idle
//!    │                 ▲
//!    └─gate & 5×ok─▶ PumpScheduled ◀─recovered─┐
//!                      │                        │
//!                      └──low──▶ LowWaterGrace ─┘
//!                                  │ grace expired ──▶ Idle (alarm)
//!                                  └ 5×low ──────────▶ Filling
//! ```
use chrono::{NaiveDateTime, TimeDelta};
use hydro_traits::{Actuator, Sensor};

use crate::config::CirculationCfg;
use crate::controller::TickIo;
use crate::schedule::ScheduleGate;
use crate::window::SignalWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Valve closed, nothing running.
    Idle,
    /// Refilling the tank since the given time.
    Filling { since: NaiveDateTime },
    /// Low water seen while circulating; pump keeps running until grace expires.
    LowWaterGrace { since: NaiveDateTime },
    /// Circulation pump on per the daily schedule.
    PumpScheduled,
}

impl Phase {
    pub fn pump_on(&self) -> bool {
        matches!(self, Phase::PumpScheduled | Phase::LowWaterGrace { .. })
    }

    /// The refill valve is open only while filling.
    pub fn valve_open(&self) -> bool {
        matches!(self, Phase::Filling { .. })
    }

    pub fn is_filling(&self) -> bool {
        matches!(self, Phase::Filling { .. })
    }

    /// Start of the running fill or low-water grace timer.
    pub fn filling_started_at(&self) -> Option<NaiveDateTime> {
        match self {
            Phase::Filling { since } | Phase::LowWaterGrace { since } => Some(*since),
            Phase::Idle | Phase::PumpScheduled => None,
        }
    }
}

/// Notable transitions, for logging and alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    FillStarted,
    /// Top sensor reported full.
    FillTopFull,
    /// Fill time elapsed with the bottom sensor still low.
    FillComplete,
    /// Fill time elapsed after the bottom sensor already recovered.
    FillStoppedEarly,
    PumpStarted,
    PumpStopped,
    LowWater,
    WaterRecovered,
    GraceExpired,
}

/// Sensor-derived inputs to one transition.
#[derive(Debug, Clone, Copy)]
pub struct Inputs {
    pub now: NaiveDateTime,
    /// Full bottom window, all low.
    pub debounced_low: bool,
    /// Full bottom window, none low.
    pub sufficient: bool,
    /// Most recent bottom reading was low.
    pub latest_low: bool,
    pub top_full: bool,
    /// Circulation schedule gate is engaged.
    pub engaged: bool,
}

/// Pure transition function of the circulation state machine.
pub fn step(
    phase: Phase,
    i: &Inputs,
    fill: TimeDelta,
    grace: TimeDelta,
) -> (Phase, Option<Event>) {
    match phase {
        Phase::Idle => {
            if i.debounced_low {
                (Phase::Filling { since: i.now }, Some(Event::FillStarted))
            } else if i.engaged && i.sufficient {
                (Phase::PumpScheduled, Some(Event::PumpStarted))
            } else {
                (Phase::Idle, None)
            }
        }
        Phase::Filling { since } => {
            if i.top_full {
                (Phase::Idle, Some(Event::FillTopFull))
            } else if i.now - since >= fill {
                let ev = if i.debounced_low {
                    Event::FillComplete
                } else {
                    Event::FillStoppedEarly
                };
                (Phase::Idle, Some(ev))
            } else {
                (phase, None)
            }
        }
        Phase::PumpScheduled => {
            if !i.engaged {
                (Phase::Idle, Some(Event::PumpStopped))
            } else if i.debounced_low {
                (Phase::Filling { since: i.now }, Some(Event::FillStarted))
            } else if i.latest_low {
                (Phase::LowWaterGrace { since: i.now }, Some(Event::LowWater))
            } else {
                (phase, None)
            }
        }
        Phase::LowWaterGrace { since } => {
            if !i.engaged {
                (Phase::Idle, Some(Event::PumpStopped))
            } else if i.debounced_low {
                (Phase::Filling { since: i.now }, Some(Event::FillStarted))
            } else if !i.latest_low {
                (Phase::PumpScheduled, Some(Event::WaterRecovered))
            } else if i.now - since >= grace {
                (Phase::Idle, Some(Event::GraceExpired))
            } else {
                (phase, None)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CirculationState {
    /// Debounce window of bottom-sensor readings; `true` means low water.
    pub bottom: SignalWindow<bool>,
    pub phase: Phase,
    pub gate: ScheduleGate,
    /// Raised when the grace timer expires; cleared once water is back.
    pub low_water_alarm: bool,
}

impl CirculationState {
    pub fn new(gate: ScheduleGate) -> Self {
        Self {
            bottom: SignalWindow::new(),
            phase: Phase::Idle,
            gate,
            low_water_alarm: false,
        }
    }

    pub fn pump_on(&self) -> bool {
        self.phase.pump_on()
    }

    pub fn filling_started_at(&self) -> Option<NaiveDateTime> {
        self.phase.filling_started_at()
    }

    /// Tank reported low (debounced) or a refill is running.
    pub fn low_water(&self) -> bool {
        self.phase.is_filling() || self.bottom.all_agree(true)
    }
}

pub fn tick(st: &mut CirculationState, cfg: &CirculationCfg, io: &mut TickIo<'_>) {
    if let Some(low) = io.read_digital(Sensor::WaterLevelBottom) {
        st.bottom.push(low);
    }
    // An unreadable top switch never ends a fill early; the fill timer still does.
    let top_full = io.read_digital(Sensor::WaterLevelTop).unwrap_or(false);
    if let Some(edge) = st.gate.evaluate(io.now) {
        tracing::info!(?edge, at = %io.now.time(), "circulation schedule");
    }

    let inputs = Inputs {
        now: io.now,
        debounced_low: st.bottom.all_agree(true),
        sufficient: st.bottom.all_agree(false),
        latest_low: st.bottom.latest().unwrap_or(false),
        top_full,
        engaged: st.gate.is_engaged(),
    };
    let (next, event) = step(st.phase, &inputs, cfg.fill, cfg.schedule.grace());

    if let Some(ev) = event {
        match ev {
            Event::FillStarted => tracing::info!("bottom sensor low, filling tank"),
            Event::FillTopFull => tracing::info!("top sensor full, fill stopped"),
            Event::FillComplete => tracing::info!("fill duration complete"),
            Event::FillStoppedEarly => tracing::info!("fill stopped early, water level changed"),
            Event::PumpStarted => tracing::info!("circulation pump on per schedule"),
            Event::PumpStopped => tracing::info!("circulation pump off per schedule"),
            Event::LowWater => tracing::warn!("water low while circulating, grace timer started"),
            Event::WaterRecovered => tracing::info!("water level recovered"),
            Event::GraceExpired => {
                tracing::warn!("water low past grace period, circulation pump forced off");
            }
        }
        if matches!(
            ev,
            Event::FillTopFull | Event::FillComplete | Event::FillStoppedEarly
        ) {
            st.bottom.clear();
        }
        if ev == Event::GraceExpired {
            st.low_water_alarm = true;
        }
        if ev == Event::FillTopFull {
            st.low_water_alarm = false;
        }
    }
    if st.low_water_alarm && inputs.sufficient {
        tracing::info!("low-water alarm cleared");
        st.low_water_alarm = false;
    }
    st.phase = next;
    io.report.phase = next;

    io.command(Actuator::WaterValve, next.valve_open());
    io.command(Actuator::WaterPump, next.pump_on());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(secs: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + TimeDelta::seconds(secs)
    }

    fn inputs(now: NaiveDateTime) -> Inputs {
        Inputs {
            now,
            debounced_low: false,
            sufficient: true,
            latest_low: false,
            top_full: false,
            engaged: true,
        }
    }

    const FILL: TimeDelta = TimeDelta::seconds(180);
    const GRACE: TimeDelta = TimeDelta::minutes(5);

    #[test]
    fn valve_and_pump_are_never_on_together() {
        let phases = [
            Phase::Idle,
            Phase::Filling { since: at(0) },
            Phase::LowWaterGrace { since: at(0) },
            Phase::PumpScheduled,
        ];
        for p in phases {
            assert!(!(p.valve_open() && p.pump_on()), "{p:?}");
        }
        assert!(Phase::Filling { since: at(0) }.valve_open());
        assert!(!Phase::PumpScheduled.valve_open());
        assert!(!Phase::LowWaterGrace { since: at(0) }.valve_open());
    }

    #[test]
    fn filling_has_precedence_over_schedule() {
        let i = Inputs {
            debounced_low: true,
            sufficient: false,
            latest_low: true,
            ..inputs(at(0))
        };
        assert_eq!(
            step(Phase::Idle, &i, FILL, GRACE),
            (Phase::Filling { since: at(0) }, Some(Event::FillStarted))
        );
    }

    #[test]
    fn fill_timeout_reports_complete_or_early() {
        let filling = Phase::Filling { since: at(0) };
        let still_low = Inputs {
            debounced_low: true,
            sufficient: false,
            ..inputs(at(180))
        };
        assert_eq!(
            step(filling, &still_low, FILL, GRACE),
            (Phase::Idle, Some(Event::FillComplete))
        );
        let recovered = Inputs {
            sufficient: false,
            ..inputs(at(180))
        };
        assert_eq!(
            step(filling, &recovered, FILL, GRACE),
            (Phase::Idle, Some(Event::FillStoppedEarly))
        );
        assert_eq!(step(filling, &inputs(at(179)), FILL, GRACE).0, filling);
    }

    #[test]
    fn grace_expiry_forces_pump_off() {
        let grace = Phase::LowWaterGrace { since: at(0) };
        let low = Inputs {
            latest_low: true,
            sufficient: false,
            ..inputs(at(299))
        };
        assert_eq!(step(grace, &low, FILL, GRACE), (grace, None));
        let low = Inputs { now: at(300), ..low };
        assert_eq!(
            step(grace, &low, FILL, GRACE),
            (Phase::Idle, Some(Event::GraceExpired))
        );
    }

    #[test]
    fn recovery_returns_to_scheduled_pumping() {
        let grace = Phase::LowWaterGrace { since: at(0) };
        assert_eq!(
            step(grace, &inputs(at(30)), FILL, GRACE),
            (Phase::PumpScheduled, Some(Event::WaterRecovered))
        );
    }

    #[test]
    fn schedule_off_stops_pump_even_in_grace() {
        let i = Inputs {
            engaged: false,
            ..inputs(at(10))
        };
        assert_eq!(
            step(Phase::LowWaterGrace { since: at(0) }, &i, FILL, GRACE).0,
            Phase::Idle
        );
        assert_eq!(step(Phase::PumpScheduled, &i, FILL, GRACE).0, Phase::Idle);
    }
}
