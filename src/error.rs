//! Error types for the sensor link and configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the serial sensor link.
///
/// None of these are fatal to a session: a player whose device fails to
/// connect simply plays without sensor input.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The serial device could not be opened.
    #[error("failed to open serial device '{port}': {reason}")]
    Connect {
        /// Device path or name.
        port: String,
        /// Description reported by the driver.
        reason: String,
    },
    /// An outbound LED command could not be written.
    #[error("failed to write LED command {led}: {source}")]
    Write {
        /// The LED code that was being sent.
        led: u8,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Any other I/O failure on the link.
    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while loading or validating a [`GameConfig`](crate::GameConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The configuration file is not valid JSON for the expected schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of its allowed range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for sensor link operations.
pub type SensorResult<T> = Result<T, SensorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_message() {
        let err = SensorError::Connect {
            port: "/dev/ttyUSB0".to_string(),
            reason: "No such file or directory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/dev/ttyUSB0"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn test_write_error_keeps_led_code() {
        let err = SensorError::Write {
            led: 3,
            source: io::Error::new(io::ErrorKind::BrokenPipe, "gone"),
        };
        assert!(err.to_string().contains("LED command 3"));
    }
}
