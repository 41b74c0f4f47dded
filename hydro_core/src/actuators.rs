//! Single-writer access to the actuator HAL.
//!
//! Every output write, from the tick thread or a pump worker, goes through one
//! mutex that also guards the table of last successfully commanded states.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use hydro_traits::{Actuator, Actuators};

use crate::error::ControlError;
use crate::hw_error::map_hw_error;

struct Inner {
    hal: Box<dyn Actuators + Send>,
    commanded: HashMap<Actuator, bool>,
}

#[derive(Clone)]
pub struct ActuatorBank {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for ActuatorBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorBank")
            .field("commanded", &self.snapshot())
            .finish()
    }
}

impl ActuatorBank {
    pub fn new(hal: impl Actuators + Send + 'static) -> Self {
        Self::from_boxed(Box::new(hal))
    }

    pub fn from_boxed(hal: Box<dyn Actuators + Send>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                hal,
                commanded: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, ControlError> {
        self.inner
            .lock()
            .map_err(|_| ControlError::State("actuator lock poisoned".into()))
    }

    /// Write `on` only if it differs from the last successful command (or none
    /// was issued yet). Returns whether a write happened. On failure the table
    /// is left untouched so the next call retries.
    pub fn command(&self, actuator: Actuator, on: bool) -> Result<bool, ControlError> {
        let mut inner = self.lock()?;
        if inner.commanded.get(&actuator) == Some(&on) {
            return Ok(false);
        }
        inner
            .hal
            .set(actuator, on)
            .map_err(|e| map_hw_error(e.as_ref()))?;
        inner.commanded.insert(actuator, on);
        tracing::info!(actuator = %actuator, on, "actuator commanded");
        Ok(true)
    }

    /// Unconditional write, used by timed pump runs and shutdown.
    pub fn write(&self, actuator: Actuator, on: bool) -> Result<(), ControlError> {
        let mut inner = self.lock()?;
        inner
            .hal
            .set(actuator, on)
            .map_err(|e| map_hw_error(e.as_ref()))?;
        inner.commanded.insert(actuator, on);
        Ok(())
    }

    /// Last successfully commanded state, if any.
    pub fn commanded(&self, actuator: Actuator) -> Option<bool> {
        self.lock()
            .ok()
            .and_then(|i| i.commanded.get(&actuator).copied())
    }

    /// Commanded states sorted by actuator.
    pub fn snapshot(&self) -> Vec<(Actuator, bool)> {
        let mut v: Vec<_> = self
            .lock()
            .map(|i| i.commanded.iter().map(|(a, on)| (*a, *on)).collect())
            .unwrap_or_default();
        v.sort();
        v
    }
}
