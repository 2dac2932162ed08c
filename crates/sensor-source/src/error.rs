//! Sensor Error Types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while sampling the local sensors
#[derive(Debug, Error)]
pub enum SensorReadError {
    /// No 1-Wire temperature probe present
    #[error("No temperature sensor found in {}", .0.display())]
    NoSensorFound(PathBuf),

    /// The probe reported a CRC failure for the last conversion
    #[error("CRC check failed for temperature sensor {0}")]
    CrcMismatch(String),

    /// The probe returned its power-on reset value instead of a conversion
    #[error("Temperature sensor {0} returned its power-on reset value")]
    PowerOnReset(String),

    /// Sensor payload could not be parsed
    #[error("Invalid sensor payload: {0}")]
    InvalidPayload(String),

    /// GPIO line could not be configured or read
    #[error("GPIO pin {pin} error: {reason}")]
    Gpio { pin: u32, reason: String },

    /// Read did not complete in time
    #[error("Sensor read timed out after {0}ms")]
    Timeout(u64),

    /// Sensor handles were already released
    #[error("Sensor handles have been released")]
    Released,

    /// Underlying filesystem error
    #[error("Sensor I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SensorReadError {
    fn from(err: std::io::Error) -> Self {
        SensorReadError::Io(err.to_string())
    }
}
