//! Grow light on a daily schedule.
use hydro_traits::Actuator;

use crate::controller::TickIo;
use crate::schedule::{Schedule, ScheduleGate};

#[derive(Debug, Clone)]
pub struct LightingState {
    pub gate: ScheduleGate,
}

impl LightingState {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            gate: ScheduleGate::new(schedule),
        }
    }
}

pub fn tick(st: &mut LightingState, io: &mut TickIo<'_>) {
    if let Some(edge) = st.gate.evaluate(io.now) {
        tracing::info!(?edge, at = %io.now.time(), "light schedule");
    }
    io.command(Actuator::Light, st.gate.is_engaged());
}
