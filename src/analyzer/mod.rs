// src/analyzer/mod.rs
//
// USB-CAN Analyzer serial protocol driver, for the Seeed Studio USB-CAN
// Analyzer and compatible adapters.
//
// Wire format (same layout both directions):
//   [0xAA][Type][ID-2bytes-LE (standard) or 4bytes-LE (extended)][Data...][0x55]
//
// Type byte: 0xC0 | extended<<5 | rtr<<4 | dlc

pub mod codec;
pub mod device;

// Re-export public items
// Note: AnalyzerCodec is also available via codec::AnalyzerCodec
pub use codec::AnalyzerCodec;
pub use device::{AnalyzerConfig, UsbCanAnalyzer};
