//! Type-state builder for `Controller`.
//!
//! The builder enforces at compile time that sensors, actuators and a
//! configuration are provided before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use hydro_traits::{Actuators, Clock, MonotonicClock, Sensors};

use crate::actuators::ActuatorBank;
use crate::config::ControllerCfg;
use crate::controller::Controller;
use crate::error::{BuildError, Result};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Controller`. The configuration is validated on `build()`.
pub struct ControllerBuilder<S, A, C> {
    sensors: Option<Box<dyn Sensors + Send>>,
    actuators: Option<Box<dyn Actuators + Send>>,
    cfg: Option<ControllerCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _s: PhantomData<S>,
    _a: PhantomData<A>,
    _c: PhantomData<C>,
}

impl Default for ControllerBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            sensors: None,
            actuators: None,
            cfg: None,
            clock: None,
            _s: PhantomData,
            _a: PhantomData,
            _c: PhantomData,
        }
    }
}

fn validate(cfg: &ControllerCfg) -> Result<()> {
    if cfg.tick.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "tick must be > 0",
        )));
    }
    let tick = chrono::TimeDelta::from_std(cfg.tick)
        .map_err(|_| eyre::Report::new(BuildError::InvalidConfig("tick out of range")))?;
    if tick >= cfg.circulation.schedule.grace() || tick >= cfg.lighting.grace() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "tick must be shorter than every schedule grace period",
        )));
    }
    if tick > cfg.ec.window_end - cfg.ec.window_start {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "tick must not exceed the nutrient dosing window",
        )));
    }
    if cfg.ph.dose.is_zero() || cfg.ec.nutrient_dose.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "dose durations must be > 0",
        )));
    }
    if cfg.circulation.fill <= chrono::TimeDelta::zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "fill duration must be > 0",
        )));
    }
    Ok(())
}

impl<S, A, C> ControllerBuilder<S, A, C> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Controller> {
        let sensors = self
            .sensors
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensors))?;
        let actuators = self
            .actuators
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuators))?;
        let cfg = self
            .cfg
            .ok_or_else(|| eyre::Report::new(BuildError::MissingConfig))?;
        validate(&cfg)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };
        let controller =
            Controller::new(sensors, ActuatorBank::from_boxed(actuators), clock, cfg)?;
        Ok(controller)
    }

    /// Clock used to time pump runs; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<A, C> ControllerBuilder<Missing, A, C> {
    pub fn with_sensors(
        self,
        sensors: impl Sensors + Send + 'static,
    ) -> ControllerBuilder<Set, A, C> {
        ControllerBuilder {
            sensors: Some(Box::new(sensors)),
            actuators: self.actuators,
            cfg: self.cfg,
            clock: self.clock,
            _s: PhantomData,
            _a: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<S, C> ControllerBuilder<S, Missing, C> {
    pub fn with_actuators(
        self,
        actuators: impl Actuators + Send + 'static,
    ) -> ControllerBuilder<S, Set, C> {
        ControllerBuilder {
            sensors: self.sensors,
            actuators: Some(Box::new(actuators)),
            cfg: self.cfg,
            clock: self.clock,
            _s: PhantomData,
            _a: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<S, A> ControllerBuilder<S, A, Missing> {
    pub fn with_config(self, cfg: ControllerCfg) -> ControllerBuilder<S, A, Set> {
        ControllerBuilder {
            sensors: self.sensors,
            actuators: self.actuators,
            cfg: Some(cfg),
            clock: self.clock,
            _s: PhantomData,
            _a: PhantomData,
            _c: PhantomData,
        }
    }
}

impl ControllerBuilder<Set, Set, Set> {
    /// Build once sensors, actuators and config are all set.
    pub fn build(self) -> Result<Controller> {
        self.try_build()
    }
}
