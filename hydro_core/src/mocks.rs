//! Test and helper mocks for hydro_core.
//!
//! All mocks are cheap clonable handles over shared state, so a test can keep
//! one clone while the controller owns another.
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use hydro_traits::{Actuator, Actuators, Reading, Sensor, Sensors};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
enum Scripted {
    Value(Reading),
    Fail(String),
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<Sensor, VecDeque<Scripted>>,
    steady: HashMap<Sensor, Scripted>,
    reads: HashMap<Sensor, usize>,
}

/// Sensors that replay queued values, then repeat a steady value.
///
/// A sensor with neither queued nor steady values fails its reads.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensors {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSensors {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> Option<R> {
        self.script.lock().ok().map(|mut s| f(&mut s))
    }

    /// Value returned whenever nothing is queued.
    pub fn set(&self, sensor: Sensor, reading: Reading) -> &Self {
        self.with(|s| s.steady.insert(sensor, Scripted::Value(reading)));
        self
    }

    pub fn set_analog(&self, sensor: Sensor, v: f64) -> &Self {
        self.set(sensor, Reading::Analog(v))
    }

    pub fn set_digital(&self, sensor: Sensor, b: bool) -> &Self {
        self.set(sensor, Reading::Digital(b))
    }

    /// Queue analog values returned once each, before the steady value.
    pub fn queue_analog(&self, sensor: Sensor, values: &[f64]) -> &Self {
        self.with(|s| {
            let q = s.queued.entry(sensor).or_default();
            q.extend(values.iter().map(|&v| Scripted::Value(Reading::Analog(v))));
        });
        self
    }

    pub fn queue_digital(&self, sensor: Sensor, values: &[bool]) -> &Self {
        self.with(|s| {
            let q = s.queued.entry(sensor).or_default();
            q.extend(values.iter().map(|&b| Scripted::Value(Reading::Digital(b))));
        });
        self
    }

    /// Make every read of `sensor` fail until `set` is called again.
    pub fn fail(&self, sensor: Sensor) -> &Self {
        self.with(|s| {
            s.queued.remove(&sensor);
            s.steady
                .insert(sensor, Scripted::Fail(format!("{sensor} unavailable")));
        });
        self
    }

    /// Number of reads issued for `sensor` so far.
    pub fn reads(&self, sensor: Sensor) -> usize {
        self.with(|s| s.reads.get(&sensor).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Sensors for ScriptedSensors {
    fn read(&mut self, sensor: Sensor) -> Result<Reading, BoxError> {
        let next = self
            .with(|s| {
                *s.reads.entry(sensor).or_default() += 1;
                s.queued
                    .get_mut(&sensor)
                    .and_then(VecDeque::pop_front)
                    .or_else(|| s.steady.get(&sensor).cloned())
            })
            .flatten();
        match next {
            Some(Scripted::Value(r)) => Ok(r),
            Some(Scripted::Fail(msg)) => Err(Box::new(std::io::Error::other(msg))),
            None => Err(Box::new(std::io::Error::other(format!(
                "{sensor} not scripted"
            )))),
        }
    }
}

/// Actuators that record every successful write in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuators {
    log: Arc<Mutex<Vec<(Actuator, bool)>>>,
}

impl RecordingActuators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<(Actuator, bool)> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn writes_for(&self, actuator: Actuator) -> Vec<bool> {
        self.writes()
            .into_iter()
            .filter(|(a, _)| *a == actuator)
            .map(|(_, on)| on)
            .collect()
    }

    /// Last written state; actuators never written read as off.
    pub fn is_on(&self, actuator: Actuator) -> bool {
        self.writes_for(actuator).last().copied().unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut l) = self.log.lock() {
            l.clear();
        }
    }
}

impl Actuators for RecordingActuators {
    fn set(&mut self, actuator: Actuator, on: bool) -> Result<(), BoxError> {
        self.log
            .lock()
            .map_err(|_| std::io::Error::other("recording lock poisoned"))?
            .push((actuator, on));
        Ok(())
    }
}

/// Recording actuators whose writes to selected outputs fail on demand.
#[derive(Debug, Clone, Default)]
pub struct FailingActuators {
    pub recorder: RecordingActuators,
    failing: Arc<Mutex<HashSet<Actuator>>>,
    stuck_on: Arc<Mutex<HashSet<Actuator>>>,
}

impl FailingActuators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, actuator: Actuator) {
        if let Ok(mut f) = self.failing.lock() {
            f.insert(actuator);
        }
    }

    /// Accept `on` writes to `actuator` but fail every `off` write.
    pub fn stick_on(&self, actuator: Actuator) {
        if let Ok(mut f) = self.stuck_on.lock() {
            f.insert(actuator);
        }
    }

    pub fn heal(&self, actuator: Actuator) {
        if let Ok(mut f) = self.failing.lock() {
            f.remove(&actuator);
        }
        if let Ok(mut f) = self.stuck_on.lock() {
            f.remove(&actuator);
        }
    }
}

impl Actuators for FailingActuators {
    fn set(&mut self, actuator: Actuator, on: bool) -> Result<(), BoxError> {
        let failing = self
            .failing
            .lock()
            .map(|f| f.contains(&actuator))
            .unwrap_or(true);
        let stuck = !on
            && self
                .stuck_on
                .lock()
                .map(|f| f.contains(&actuator))
                .unwrap_or(true);
        if failing || stuck {
            return Err(Box::new(std::io::Error::other(format!(
                "relay for {actuator} not responding"
            ))));
        }
        self.recorder.set(actuator, on)
    }
}
