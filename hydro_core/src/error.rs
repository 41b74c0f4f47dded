use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    #[error("hardware error: {0}")]
    Hal(String),
    #[error("timeout waiting for hardware")]
    Timeout,
    #[error("insufficient data: have {have} of {need} samples")]
    InsufficientData { have: usize, need: usize },
    #[error("calibration error: {0}")]
    Calibration(String),
    #[error("schedule configuration error: {0}")]
    ScheduleConfig(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing sensors")]
    MissingSensors,
    #[error("missing actuators")]
    MissingActuators,
    #[error("missing controller config")]
    MissingConfig,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
