// src/analyzer/device.rs
//
// USB-CAN Analyzer device driver.
//
// Opens the adapter's serial port (fixed 2 Mbaud, 8N1) and moves frames
// across it one at a time. Receive is a one-shot state machine per attempt:
// each call starts fresh at the start sentinel and carries no partial
// progress to the next call. A timeout or framing fault mid-frame drops the
// assembled bytes and reports "no frame this attempt"; the stream
// resynchronizes on the next 0xAA that lands at the front of an attempt.

use hex::ToHex;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::time::Duration;

use super::codec::{constants, AnalyzerCodec};
use crate::codec::FrameCodec;
use crate::error::IoError;
use crate::interface::CanInterface;
use crate::{now_us, CanFrame, CanTransmitFrame};

// ============================================================================
// Constants
// ============================================================================

/// Serial baud rate the adapter firmware runs at
pub const DEFAULT_BAUD_RATE: u32 = 2_000_000;

/// Per-read timeout bounding each step of a receive attempt
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 50;

// ============================================================================
// Configuration
// ============================================================================

/// USB-CAN Analyzer driver configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Serial port path (e.g., "/dev/cu.usbserial-1101", "COM3")
    pub port: String,
    /// Serial baud rate - the adapter hardware runs at 2 Mbaud
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Per-read timeout in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Display name for the channel (defaults to the port path)
    #[serde(default)]
    pub display_name: Option<String>,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

impl AnalyzerConfig {
    /// Configuration for a port with the adapter's fixed defaults.
    pub fn for_port(port: impl Into<String>) -> Self {
        AnalyzerConfig {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            display_name: None,
        }
    }
}

// ============================================================================
// Device
// ============================================================================

/// USB-CAN Analyzer device, held open for send/receive.
///
/// The serial handle is exclusively owned; `&mut self` on every operation
/// keeps one send or receive in flight at a time without locking.
pub struct UsbCanAnalyzer {
    /// `None` after shutdown
    port: Option<Box<dyn serialport::SerialPort>>,
    channel_info: String,
    /// Error label, e.g. "analyzer(/dev/ttyUSB0)"
    device: String,
}

impl UsbCanAnalyzer {
    /// Open the adapter on the configured serial channel.
    ///
    /// Serial framing is fixed by the adapter: 8 data bits, no parity,
    /// 1 stop bit.
    pub fn open(config: &AnalyzerConfig) -> Result<Self, IoError> {
        let device = format!("analyzer({})", config.port);

        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()
            .map_err(|e| IoError::connection(&device, e.to_string()))?;

        let display = config
            .display_name
            .clone()
            .unwrap_or_else(|| config.port.clone());
        let channel_info = format!("USB-CAN Analyzer: {}", display);

        tlog!(
            "[analyzer] Opened {} (baud: {}, read timeout: {}ms)",
            config.port,
            config.baud_rate,
            config.read_timeout_ms
        );

        Ok(UsbCanAnalyzer {
            port: Some(port),
            channel_info,
            device,
        })
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, IoError> {
        match self.port.as_mut() {
            Some(p) => Ok(p),
            None => Err(IoError::connection(&self.device, "port is closed")),
        }
    }
}

impl CanInterface for UsbCanAnalyzer {
    fn channel_info(&self) -> &str {
        &self.channel_info
    }

    fn send(&mut self, frame: &CanTransmitFrame) -> Result<(), IoError> {
        let bytes = AnalyzerCodec::encode(frame)?;
        let device = self.device.clone();
        let port = self.port_mut()?;
        port.write_all(&bytes)
            .map_err(|e| IoError::transport(&device, format!("write: {}", e)))?;
        port.flush()
            .map_err(|e| IoError::transport(&device, format!("flush: {}", e)))?;
        Ok(())
    }

    fn receive_attempt(&mut self) -> Result<Option<CanFrame>, IoError> {
        let device = self.device.clone();
        let port = self.port_mut()?;
        try_read_frame(port, &device)
    }

    fn flush_tx_buffer(&mut self) -> Result<(), IoError> {
        let device = self.device.clone();
        self.port_mut()?
            .clear(serialport::ClearBuffer::Output)
            .map_err(|e| IoError::transport(&device, format!("clear output buffer: {}", e)))
    }

    fn shutdown(&mut self) -> Result<(), IoError> {
        if self.port.take().is_some() {
            tlog!("[analyzer] Closed {}", self.channel_info);
        }
        Ok(())
    }
}

// ============================================================================
// Receive State Machine
// ============================================================================

/// One decode attempt against the inbound byte stream.
///
/// States, in order: seek start sentinel, read type byte, read 2- or 4-byte
/// little-endian ID, read `dlc` payload bytes, check end sentinel. A byte
/// that isn't 0xAA at the front is consumed and discarded. A timeout or
/// short read in any later state rejects the attempt; consumed bytes are
/// not rescanned for an embedded start sentinel.
///
/// Generic over `Read` so the state machine is testable without a serial
/// port; timeouts surface as `ErrorKind::TimedOut` or a zero-length read.
fn try_read_frame<R: Read>(reader: &mut R, device: &str) -> Result<Option<CanFrame>, IoError> {
    use constants::*;

    let mut start = [0u8; 1];
    if !read_full(reader, &mut start, device)? {
        return Ok(None);
    }
    if start[0] != FRAME_START {
        // Desynchronized stream - discard and let the caller retry
        return Ok(None);
    }

    let mut ty = [0u8; 1];
    if !read_full(reader, &mut ty, device)? {
        return Ok(None);
    }
    let is_extended = ty[0] & EXTENDED_FLAG != 0;
    let is_rtr = ty[0] & RTR_FLAG != 0;
    let dlc = ty[0] & DLC_MASK;

    // The nibble can structurally carry up to 15; classic CAN stops at 8
    if dlc > MAX_DLC {
        return Ok(None);
    }

    let id_len = if is_extended { 4 } else { 2 };
    let mut id_bytes = [0u8; 4];
    if !read_full(reader, &mut id_bytes[..id_len], device)? {
        return Ok(None);
    }
    let frame_id = u32::from_le_bytes(id_bytes);

    let mut data = vec![0u8; dlc as usize];
    if !read_full(reader, &mut data, device)? {
        return Ok(None);
    }

    let mut end = [0u8; 1];
    if !read_full(reader, &mut end, device)? {
        return Ok(None);
    }
    if end[0] != FRAME_END {
        tlog!(
            "[analyzer] Framing fault on {}: end sentinel {:02X}, dropping frame (id={:X} data={})",
            device,
            end[0],
            frame_id,
            data.encode_hex::<String>()
        );
        return Ok(None);
    }

    Ok(Some(CanFrame {
        timestamp_us: now_us(),
        frame_id,
        dlc,
        bytes: data,
        is_extended,
        is_rtr,
    }))
}

/// Fill `buf` from the reader, each read bounded by the port's timeout.
///
/// Returns `Ok(false)` when the stream times out or runs dry before `buf`
/// is full - the caller treats that as a failed frame assembly. Hard I/O
/// errors propagate as transport faults.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8], device: &str) -> Result<bool, IoError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(false),
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(IoError::transport(device, e.to_string())),
        }
    }
    Ok(true)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn attempt(bytes: &[u8]) -> Result<Option<CanFrame>, IoError> {
        try_read_frame(&mut Cursor::new(bytes.to_vec()), "analyzer(test)")
    }

    #[test]
    fn test_receive_standard_frame() {
        let frame = attempt(&[0xAA, 0xC2, 0x23, 0x01, 0x11, 0x22, 0x55])
            .unwrap()
            .unwrap();
        assert_eq!(frame.frame_id, 0x123);
        assert_eq!(frame.dlc, 2);
        assert_eq!(frame.bytes, vec![0x11, 0x22]);
        assert!(!frame.is_extended);
        assert!(!frame.is_rtr);
        assert!(frame.timestamp_us > 0);
    }

    #[test]
    fn test_receive_extended_frame_reads_four_id_bytes() {
        let frame = attempt(&[0xAA, 0xE0, 0xDE, 0xBC, 0x1A, 0x00, 0x55])
            .unwrap()
            .unwrap();
        assert_eq!(frame.frame_id, 0x1ABCDE);
        assert_eq!(frame.dlc, 0);
        assert!(frame.bytes.is_empty());
        assert!(frame.is_extended);
    }

    #[test]
    fn test_receive_rtr_frame() {
        // Type 0xD2: rtr flag + dlc 2
        let frame = attempt(&[0xAA, 0xD2, 0x23, 0x01, 0x00, 0x00, 0x55])
            .unwrap()
            .unwrap();
        assert!(frame.is_rtr);
        assert_eq!(frame.dlc, 2);
    }

    #[test]
    fn test_receive_empty_stream_is_no_frame() {
        assert_eq!(attempt(&[]).unwrap(), None);
    }

    #[test]
    fn test_receive_discards_one_garbage_byte_per_attempt() {
        let stream = [0x00, 0xFF, 0xAA, 0xC2, 0x23, 0x01, 0x11, 0x22, 0x55];
        let mut cursor = Cursor::new(stream.to_vec());

        // Two attempts land on garbage, the third lands on the start sentinel
        assert_eq!(try_read_frame(&mut cursor, "analyzer(test)").unwrap(), None);
        assert_eq!(try_read_frame(&mut cursor, "analyzer(test)").unwrap(), None);
        let frame = try_read_frame(&mut cursor, "analyzer(test)")
            .unwrap()
            .unwrap();
        assert_eq!(frame.frame_id, 0x123);
        assert_eq!(frame.bytes, vec![0x11, 0x22]);
    }

    #[test]
    fn test_receive_rejects_bad_end_sentinel() {
        assert_eq!(
            attempt(&[0xAA, 0xC2, 0x23, 0x01, 0x11, 0x22, 0x56]).unwrap(),
            None
        );
    }

    #[test]
    fn test_receive_rejects_oversized_dlc() {
        // Type 0xCF declares dlc 15
        assert_eq!(
            attempt(&[0xAA, 0xCF, 0x23, 0x01, 0x55]).unwrap(),
            None
        );
    }

    #[test]
    fn test_receive_truncated_mid_id_is_no_frame() {
        assert_eq!(attempt(&[0xAA, 0xC2, 0x23]).unwrap(), None);
    }

    #[test]
    fn test_receive_truncated_mid_payload_is_no_frame() {
        assert_eq!(attempt(&[0xAA, 0xC4, 0x23, 0x01, 0x11]).unwrap(), None);
    }

    #[test]
    fn test_receive_roundtrip_through_codec() {
        let original = CanTransmitFrame {
            frame_id: 0x1ABCDE,
            data: vec![0xDE, 0xAD, 0xBE, 0xEF],
            is_extended: true,
            is_rtr: false,
        };

        let encoded = AnalyzerCodec::encode(&original).unwrap();
        let decoded = attempt(&encoded).unwrap().unwrap();

        assert_eq!(decoded.frame_id, original.frame_id);
        assert_eq!(decoded.dlc as usize, original.data.len());
        assert_eq!(decoded.bytes, original.data);
        assert_eq!(decoded.is_extended, original.is_extended);
        assert_eq!(decoded.is_rtr, original.is_rtr);
    }

    /// Reader that times out after yielding a fixed prefix
    struct TimeoutAfter {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for TimeoutAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "read timed out",
                ));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len()).min(1);
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_receive_timeout_mid_frame_is_no_frame() {
        // Valid start and type, then the stream goes quiet
        let mut reader = TimeoutAfter {
            bytes: vec![0xAA, 0xC2, 0x23],
            pos: 0,
        };
        assert_eq!(try_read_frame(&mut reader, "analyzer(test)").unwrap(), None);
    }

    #[test]
    fn test_receive_timeout_on_idle_stream_is_no_frame() {
        let mut reader = TimeoutAfter {
            bytes: vec![],
            pos: 0,
        };
        assert_eq!(try_read_frame(&mut reader, "analyzer(test)").unwrap(), None);
    }

    /// Reader that fails with a hard I/O error
    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))
        }
    }

    #[test]
    fn test_receive_hard_fault_propagates() {
        let err = try_read_frame(&mut BrokenReader, "analyzer(test)").unwrap_err();
        assert!(matches!(err, IoError::Transport { .. }));
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"port": "/dev/ttyUSB0"}"#).unwrap();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 2_000_000);
        assert_eq!(config.read_timeout_ms, 50);
        assert!(config.display_name.is_none());
    }

    #[test]
    fn test_config_for_port() {
        let config = AnalyzerConfig::for_port("COM3");
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
    }
}
