use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("sensor timeout")]
    Timeout,
    #[error("adc conversion-ready timeout")]
    ConversionTimeout,
    #[error("invalid sensor data: {0}")]
    Parse(String),
    #[error("{0} is not wired on this backend")]
    NotWired(&'static str),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
