// src/analyzer/codec.rs
//
// USB-CAN Analyzer binary protocol codec.
//
// Frame format (same layout both directions):
//   [0xAA][Type][ID-2bytes-LE (standard) or 4bytes-LE (extended)][Data...][0x55]
//
// Type byte: 0xC0 | extended<<5 | rtr<<4 | dlc

use crate::codec::FrameCodec;
use crate::error::IoError;
use crate::{now_us, CanFrame, CanTransmitFrame};

/// USB-CAN Analyzer protocol constants
pub mod constants {
    /// Start-of-frame sentinel
    pub const FRAME_START: u8 = 0xAA;
    /// End-of-frame sentinel
    pub const FRAME_END: u8 = 0x55;
    /// Fixed high bits (7..6) of the type byte
    pub const TYPE_BASE: u8 = 0xC0;
    /// Extended (29-bit) ID flag in the type byte (bit 5)
    pub const EXTENDED_FLAG: u8 = 0x20;
    /// Remote frame flag in the type byte (bit 4)
    pub const RTR_FLAG: u8 = 0x10;
    /// Data length code mask (low nibble of the type byte)
    pub const DLC_MASK: u8 = 0x0F;
    /// Maximum DLC for classic CAN. The type byte's low nibble can carry
    /// values up to 15; anything above 8 is rejected as noise.
    pub const MAX_DLC: u8 = 8;
    /// Mask for standard (11-bit) CAN ID
    pub const CAN_SFF_MASK: u32 = 0x0000_07FF;
    /// Mask for extended (29-bit) CAN ID
    pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;
    /// Minimum frame length: start + type + 2-byte ID + end
    pub const MIN_FRAME_LEN: usize = 5;
}

/// USB-CAN Analyzer binary protocol codec.
pub struct AnalyzerCodec;

impl FrameCodec for AnalyzerCodec {
    /// Raw frame is a byte slice including both sentinels
    type RawFrame = [u8];
    /// Encoded frame is a Vec<u8>
    type EncodedFrame = Vec<u8>;

    /// Decode a single complete analyzer frame from bytes.
    ///
    /// Expects the full frame: start sentinel through end sentinel.
    fn decode(raw: &[u8]) -> Result<CanFrame, IoError> {
        use constants::*;

        if raw.len() < MIN_FRAME_LEN {
            return Err(IoError::protocol(
                "analyzer",
                format!(
                    "frame too short: {} bytes, need at least {}",
                    raw.len(),
                    MIN_FRAME_LEN
                ),
            ));
        }

        if raw[0] != FRAME_START {
            return Err(IoError::protocol(
                "analyzer",
                format!("invalid start sentinel: {:02X}", raw[0]),
            ));
        }

        let ty = raw[1];
        let is_extended = ty & EXTENDED_FLAG != 0;
        let is_rtr = ty & RTR_FLAG != 0;
        let dlc = ty & DLC_MASK;

        if dlc > MAX_DLC {
            return Err(IoError::protocol(
                "analyzer",
                format!("invalid DLC: {} (max {})", dlc, MAX_DLC),
            ));
        }

        let id_len = if is_extended { 4 } else { 2 };
        let total_len = 2 + id_len + dlc as usize + 1;

        if raw.len() < total_len {
            return Err(IoError::protocol(
                "analyzer",
                format!("incomplete frame: {} bytes, need {}", raw.len(), total_len),
            ));
        }

        if raw[total_len - 1] != FRAME_END {
            return Err(IoError::protocol(
                "analyzer",
                format!("invalid end sentinel: {:02X}", raw[total_len - 1]),
            ));
        }

        // Parse frame ID (little-endian, width selected by the extended flag)
        let mut id_bytes = [0u8; 4];
        id_bytes[..id_len].copy_from_slice(&raw[2..2 + id_len]);
        let frame_id = u32::from_le_bytes(id_bytes);

        let data = raw[2 + id_len..2 + id_len + dlc as usize].to_vec();

        Ok(CanFrame {
            timestamp_us: now_us(),
            frame_id,
            dlc,
            bytes: data,
            is_extended,
            is_rtr,
        })
    }

    /// Encode a CAN frame to analyzer binary format for transmission.
    ///
    /// Fails on constraint violations instead of emitting malformed bytes:
    /// payload over 8 bytes, or an ID that does not fit the addressing
    /// width implied by `is_extended`.
    fn encode(frame: &CanTransmitFrame) -> Result<Vec<u8>, IoError> {
        use constants::*;

        if frame.data.len() > MAX_DLC as usize {
            return Err(IoError::protocol(
                "analyzer",
                format!("data too long: {} bytes (max {})", frame.data.len(), MAX_DLC),
            ));
        }

        if frame.is_extended {
            if frame.frame_id > CAN_EFF_MASK {
                return Err(IoError::protocol(
                    "analyzer",
                    format!("extended ID {:08X} exceeds 29 bits", frame.frame_id),
                ));
            }
        } else if frame.frame_id > CAN_SFF_MASK {
            return Err(IoError::protocol(
                "analyzer",
                format!("standard ID {:08X} exceeds 11 bits", frame.frame_id),
            ));
        }

        let dlc = frame.data.len() as u8;
        let mut buf = Vec::with_capacity(2 + 4 + frame.data.len() + 1);

        buf.push(FRAME_START);

        // Type byte: fixed high bits, flags, DLC nibble
        let mut ty = TYPE_BASE | dlc;
        if frame.is_extended {
            ty |= EXTENDED_FLAG;
        }
        if frame.is_rtr {
            ty |= RTR_FLAG;
        }
        buf.push(ty);

        // Frame ID (little-endian, 2 bytes standard / 4 bytes extended)
        if frame.is_extended {
            buf.extend_from_slice(&frame.frame_id.to_le_bytes());
        } else {
            buf.extend_from_slice(&(frame.frame_id as u16).to_le_bytes());
        }

        // Data bytes
        buf.extend_from_slice(&frame.data);

        buf.push(FRAME_END);

        Ok(buf)
    }
}
