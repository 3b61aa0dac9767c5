// src/codec.rs
//
// Unified frame codec trait.
//
// A codec is a pure transformation between the shared CAN frame types and a
// protocol's raw byte representation. It performs no I/O: transmission and
// reception belong to the driver holding the transport handle.

use crate::error::IoError;
use crate::{CanFrame, CanTransmitFrame};

// ============================================================================
// Frame Codec Trait
// ============================================================================

/// Trait for CAN frame codecs.
///
/// Each protocol implements this trait to provide unified encode/decode
/// operations. The associated types define the protocol-specific raw frame
/// formats.
pub trait FrameCodec {
    /// The raw frame type for decoding (e.g., byte slice, ASCII string)
    type RawFrame: ?Sized;

    /// The encoded frame type for transmission
    type EncodedFrame;

    /// Decode a raw frame into a CanFrame.
    ///
    /// Returns `Ok(CanFrame)` on success, or `Err(IoError)` if the frame
    /// is malformed or cannot be parsed.
    fn decode(raw: &Self::RawFrame) -> Result<CanFrame, IoError>;

    /// Encode a transmit frame for the protocol.
    ///
    /// Returns `Ok(EncodedFrame)` on success, or `Err(IoError)` if the frame
    /// cannot be encoded (e.g., invalid parameters).
    fn encode(frame: &CanTransmitFrame) -> Result<Self::EncodedFrame, IoError>;
}

// ============================================================================
// Re-exports from driver modules
// ============================================================================

// USB-CAN Analyzer codec
pub use super::analyzer::codec::AnalyzerCodec;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_frame() -> CanTransmitFrame {
        CanTransmitFrame {
            frame_id: 0x123,
            data: vec![0x11, 0x22, 0x33, 0x44],
            is_extended: false,
            is_rtr: false,
        }
    }

    #[test]
    fn test_analyzer_encode_sentinels() {
        let frame = make_test_frame();
        let encoded = AnalyzerCodec::encode(&frame).expect("encode failed");
        // Analyzer frames are delimited by 0xAA ... 0x55
        assert_eq!(encoded[0], 0xAA);
        assert_eq!(*encoded.last().unwrap(), 0x55);
    }

    #[test]
    fn test_analyzer_roundtrip_through_trait() {
        let frame = make_test_frame();
        let encoded = AnalyzerCodec::encode(&frame).expect("encode failed");
        let decoded = AnalyzerCodec::decode(&encoded).expect("decode failed");
        assert_eq!(decoded.frame_id, frame.frame_id);
        assert_eq!(decoded.bytes, frame.data);
    }
}
