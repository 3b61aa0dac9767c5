// src/error.rs
//
// Typed errors for driver I/O paths.
//
// Receive-side timeouts and framing faults are NOT errors - drivers report
// those as "no frame this attempt". IoError covers the cases a caller can
// act on: a port that won't open, a hard transport fault, a frame that
// fails protocol validation, or bad configuration.

use std::fmt;

/// Errors surfaced by drivers and codecs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IoError {
    /// Failed to open or keep a connection to a device
    Connection { device: String, message: String },
    /// A frame failed protocol validation (encode or decode)
    Protocol { device: String, message: String },
    /// Hard fault on the underlying transport (serial read/write)
    Transport { device: String, message: String },
    /// Invalid configuration supplied by the caller
    Configuration { message: String },
}

impl IoError {
    pub fn connection(device: &str, message: impl Into<String>) -> Self {
        IoError::Connection {
            device: device.to_string(),
            message: message.into(),
        }
    }

    pub fn protocol(device: &str, message: impl Into<String>) -> Self {
        IoError::Protocol {
            device: device.to_string(),
            message: message.into(),
        }
    }

    pub fn transport(device: &str, message: impl Into<String>) -> Self {
        IoError::Transport {
            device: device.to_string(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        IoError::Configuration {
            message: message.into(),
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Connection { device, message } => {
                write!(f, "connection error ({}): {}", device, message)
            }
            IoError::Protocol { device, message } => {
                write!(f, "protocol error ({}): {}", device, message)
            }
            IoError::Transport { device, message } => {
                write!(f, "transport error ({}): {}", device, message)
            }
            IoError::Configuration { message } => {
                write!(f, "configuration error: {}", message)
            }
        }
    }
}

impl std::error::Error for IoError {}

impl From<IoError> for String {
    fn from(e: IoError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_device() {
        let e = IoError::protocol("analyzer(/dev/ttyUSB0)", "bad sentinel");
        let s = e.to_string();
        assert!(s.contains("analyzer(/dev/ttyUSB0)"));
        assert!(s.contains("bad sentinel"));
    }

    #[test]
    fn test_string_conversion() {
        let e = IoError::configuration("port is required");
        let s: String = e.into();
        assert!(s.starts_with("configuration error"));
    }
}
