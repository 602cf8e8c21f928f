use thiserror::Error;

pub type Result<T> = std::result::Result<T, NexStarError>;

#[derive(Debug, Error)]
pub enum NexStarError {
    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NexStar hand control serial port not found")]
    PortNotFound,

    #[error("serial port is not open")]
    PortClosed,

    #[error("timeout waiting for response")]
    Timeout,

    #[error("{what} must be between {min} and {max}! Actual value was '{value}'")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("expected a {expected} byte response to {command}, got {actual} bytes: {response:02X?}")]
    MalformedResponse {
        command: &'static str,
        expected: usize,
        actual: usize,
        response: Vec<u8>,
    },

    #[error("unexpected response to {command}")]
    UnexpectedResponse { command: &'static str },

    #[error("invalid position response: {0}")]
    InvalidPosition(String),

    #[error("invalid {kind} value: {value}")]
    InvalidEnumValue { kind: &'static str, value: u8 },

    #[error("invalid device time: {0}")]
    InvalidTime(String),
}

impl NexStarError {
    pub(crate) fn out_of_range(
        what: &'static str,
        value: impl Into<f64>,
        min: impl Into<f64>,
        max: impl Into<f64>,
    ) -> Self {
        Self::OutOfRange {
            what,
            value: value.into(),
            min: min.into(),
            max: max.into(),
        }
    }
}
