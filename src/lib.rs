// src/lib.rs
//
// Driver crate for USB-CAN Analyzer adapters.
// Bridges a generic CAN interface abstraction to the adapter's fixed-format
// serial protocol: encode frames for transmission, reassemble frames from
// the inbound byte stream.

#[macro_use]
mod logging;

pub mod analyzer; // USB-CAN Analyzer serial protocol driver
pub mod codec; // Frame codec trait
mod error;
pub mod interface; // CanInterface capability seam
pub mod serial; // Serial port discovery

// Re-export driver types
pub use analyzer::{AnalyzerCodec, AnalyzerConfig, UsbCanAnalyzer};
pub use codec::FrameCodec;
pub use interface::CanInterface;
pub use serial::{list_serial_ports, SerialPortInfo};

// Error types
pub use error::IoError;

// Logging service
pub use logging::{init_file_logging, stop_file_logging};

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Shared Types (used by codec and drivers)
// ============================================================================

/// Parsed CAN frame - emitted by a driver on receive.
///
/// Immutable once built: the decoder fills every field at emission time and
/// callers only read it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    /// Host UNIX timestamp in microseconds, taken when the frame is emitted.
    pub timestamp_us: u64,
    /// CAN arbitration ID (11-bit standard or 29-bit extended)
    pub frame_id: u32,
    /// Data length code. Always equals `bytes.len()`.
    pub dlc: u8,
    pub bytes: Vec<u8>,
    /// Extended (29-bit) frame ID
    pub is_extended: bool,
    /// Remote Transmission Request
    pub is_rtr: bool,
}

/// CAN frame for transmission
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CanTransmitFrame {
    /// CAN frame ID (11-bit standard or 29-bit extended)
    pub frame_id: u32,
    /// Frame data (up to 8 bytes for classic CAN)
    pub data: Vec<u8>,
    /// Extended (29-bit) frame ID
    pub is_extended: bool,
    /// Remote Transmission Request
    pub is_rtr: bool,
}

/// Get current time in microseconds since UNIX epoch
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
