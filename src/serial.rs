// src/serial.rs
//
// Serial port discovery.
// Enumerates host serial ports so callers can offer a channel picker for
// USB-CAN adapters.

use serde::Serialize;

use crate::error::IoError;

/// Description of a host serial port
#[derive(Clone, Debug, Serialize)]
pub struct SerialPortInfo {
    /// Port path (e.g., "/dev/cu.usbserial-1101", "COM3")
    pub port_name: String,
    /// Port type: "USB", "Bluetooth", "PCI", or "Unknown"
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

/// List available serial ports
///
/// On macOS, filters out /dev/tty.* devices and only shows /dev/cu.* devices.
/// The cu (calling unit) devices are non-blocking and preferred for outgoing
/// connections. The tty (terminal) devices block on open waiting for carrier
/// detect.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, IoError> {
    let ports = serialport::available_ports()
        .map_err(|e| IoError::configuration(format!("Failed to enumerate ports: {}", e)))?;

    Ok(ports
        .into_iter()
        // On macOS, filter out /dev/tty.* devices - only show /dev/cu.* (calling unit)
        .filter(|_p| {
            #[cfg(target_os = "macos")]
            {
                !_p.port_name.starts_with("/dev/tty.")
            }
            #[cfg(not(target_os = "macos"))]
            {
                true
            }
        })
        .map(|p| {
            let (port_type, manufacturer, product, serial_number, vid, pid) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    "USB".to_string(),
                    info.manufacturer,
                    info.product,
                    info.serial_number,
                    Some(info.vid),
                    Some(info.pid),
                ),
                serialport::SerialPortType::BluetoothPort => {
                    ("Bluetooth".to_string(), None, None, None, None, None)
                }
                serialport::SerialPortType::PciPort => {
                    ("PCI".to_string(), None, None, None, None, None)
                }
                serialport::SerialPortType::Unknown => {
                    ("Unknown".to_string(), None, None, None, None, None)
                }
            };
            SerialPortInfo {
                port_name: p.port_name,
                port_type,
                manufacturer,
                product,
                serial_number,
                vid,
                pid,
            }
        })
        .collect())
}
