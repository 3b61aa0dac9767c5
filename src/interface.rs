// src/interface.rs
//
// Capability seam for CAN adapter drivers.
//
// Each concrete adapter (USB-CAN Analyzer here; GVRET, slcan, gs_usb
// elsewhere) implements this trait over its own transport and wire format,
// so callers can hold any adapter behind `dyn CanInterface`.

use crate::error::IoError;
use crate::{CanFrame, CanTransmitFrame};

/// A CAN adapter held open for sending and receiving frames.
///
/// Implementations own their transport handle exclusively. Callers serialize
/// access: at most one send or receive in flight per instance. No retry or
/// backoff lives at this layer - a failed receive attempt is simply retried
/// by the caller on its next invocation.
pub trait CanInterface {
    /// Human-readable channel description (e.g. "USB-CAN Analyzer: /dev/ttyUSB0")
    fn channel_info(&self) -> &str;

    /// Encode and transmit one frame, flushing the transport write.
    fn send(&mut self, frame: &CanTransmitFrame) -> Result<(), IoError>;

    /// Attempt to receive one frame within the transport's read timeout.
    ///
    /// `Ok(None)` means no complete frame arrived this attempt: a timeout, a
    /// desynchronized stream, or a frame that failed validation. Not an
    /// error - the caller retries on the next invocation. Hard transport
    /// faults are returned as `Err`.
    fn receive_attempt(&mut self) -> Result<Option<CanFrame>, IoError>;

    /// Discard bytes queued for transmission but not yet written.
    fn flush_tx_buffer(&mut self) -> Result<(), IoError>;

    /// Release the transport handle. Subsequent send/receive calls fail
    /// with a connection error.
    fn shutdown(&mut self) -> Result<(), IoError>;
}
