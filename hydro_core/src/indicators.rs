//! Status LEDs, buzzer and operator inputs.
use hydro_traits::{Actuator, Sensor};

use crate::controller::TickIo;

#[derive(Debug, Clone, Default)]
pub struct IndicatorState {
    /// Last door reading; `None` until the first good read.
    pub door_open: Option<bool>,
    pub button_last: bool,
    /// Operator silenced the current alarm.
    pub acknowledged: bool,
}

/// Controller conditions shown on the panel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Panel {
    pub running: bool,
    pub ph_out_of_band: bool,
    pub ec_out_of_band: bool,
    pub low_water: bool,
    /// Low-water grace expired, or a dosing pump could not be switched off.
    pub alarm: bool,
}

pub fn tick(st: &mut IndicatorState, panel: Panel, io: &mut TickIo<'_>) {
    if let Some(open) = io.read_digital(Sensor::Door) {
        if st.door_open.is_some_and(|prev| prev != open) {
            tracing::info!(open, "door state changed");
        }
        st.door_open = Some(open);
    }
    if let Some(pressed) = io.read_digital(Sensor::Button) {
        if pressed && !st.button_last && panel.alarm && !st.acknowledged {
            tracing::info!("alarm acknowledged");
            st.acknowledged = true;
        }
        st.button_last = pressed;
    }
    if !panel.alarm {
        st.acknowledged = false;
    }

    io.command(Actuator::GreenLed, panel.running);
    io.command(Actuator::RedLed, panel.ph_out_of_band);
    io.command(Actuator::BlueLed, panel.ec_out_of_band);
    io.command(Actuator::WaterLed, panel.low_water);
    io.command(Actuator::Buzzer, panel.alarm && !st.acknowledged);
}
