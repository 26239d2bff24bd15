use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub mod errors;
pub mod fake;
pub mod sync;

pub use errors::{ConnectionError, FailureKind};
pub use fake::FakeTransport;
pub use sync::SerialTransport;

/// Longest inbound line accepted before the remainder is discarded.
pub const MAX_LINE_BYTES: usize = 512;

/// Newline-delimited text link to the controller.
///
/// Polling and sending are non-blocking and are safe no-ops while the link is
/// closed, so the tick loop can call them unconditionally.
pub trait LineTransport {
    fn is_open(&self) -> bool;

    /// Open the link. `None` reuses the configured device.
    fn open(&mut self, port: Option<&str>) -> Result<(), ConnectionError>;

    fn close(&mut self);

    /// Next complete, trimmed, non-empty line, if one has arrived.
    fn poll_line(&mut self) -> Option<String>;

    /// Send `text` followed by a newline. Does nothing when closed.
    fn send_line(&mut self, text: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlMode {
    #[default]
    None,
    Software,
    Hardware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityMode {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopBitsMode {
    #[default]
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
}

/// What to do with DTR when the port opens. Many Arduino-class boards reset on
/// a DTR edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtrBehavior {
    #[default]
    Preserve,
    #[serde(alias = "assert")]
    On,
    #[serde(alias = "deassert")]
    Off,
}

impl FromStr for FlowControlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "software" | "xonxoff" => Ok(Self::Software),
            "hardware" | "rtscts" => Ok(Self::Hardware),
            _ => Err("expected none, software or hardware".into()),
        }
    }
}

impl FromStr for ParityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "odd" => Ok(Self::Odd),
            "even" => Ok(Self::Even),
            _ => Err("expected none, odd or even".into()),
        }
    }
}

impl FromStr for StopBitsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Self::One),
            "2" => Ok(Self::Two),
            _ => Err("expected 1 or 2".into()),
        }
    }
}

impl FromStr for DtrBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "on" | "assert" => Ok(Self::On),
            "off" | "deassert" => Ok(Self::Off),
            _ => Err("expected preserve, on or off".into()),
        }
    }
}

/// Line settings applied when the port is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialOptions {
    pub baud: u32,
    pub timeout_ms: u64,
    pub flow_control: FlowControlMode,
    pub parity: ParityMode,
    pub stop_bits: StopBitsMode,
    pub dtr: DtrBehavior,
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            baud: crate::config::DEFAULT_BAUD,
            timeout_ms: crate::config::DEFAULT_SERIAL_TIMEOUT_MS,
            flow_control: FlowControlMode::default(),
            parity: ParityMode::default(),
            stop_bits: StopBitsMode::default(),
            dtr: DtrBehavior::default(),
        }
    }
}

/// A serial port found on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.description)
        }
    }
}

/// Enumerate serial ports the OS reports.
pub fn available_ports() -> crate::Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|err| crate::Error::Io(std::io::Error::other(err)))?;
    Ok(ports
        .into_iter()
        .map(|port| PortInfo {
            description: describe_port_type(&port.port_type),
            name: port.port_name,
        })
        .collect())
}

fn describe_port_type(kind: &serialport::SerialPortType) -> String {
    match kind {
        serialport::SerialPortType::UsbPort(usb) => {
            let product = usb.product.clone().unwrap_or_else(|| "usb".into());
            format!("{product} {:04x}:{:04x}", usb.vid, usb.pid)
        }
        serialport::SerialPortType::BluetoothPort => "bluetooth".into(),
        serialport::SerialPortType::PciPort => "pci".into(),
        serialport::SerialPortType::Unknown => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_line_setting_names() {
        assert_eq!("hardware".parse::<FlowControlMode>(), Ok(FlowControlMode::Hardware));
        assert_eq!("EVEN".parse::<ParityMode>(), Ok(ParityMode::Even));
        assert_eq!("2".parse::<StopBitsMode>(), Ok(StopBitsMode::Two));
        assert_eq!("assert".parse::<DtrBehavior>(), Ok(DtrBehavior::On));
        assert!("3".parse::<StopBitsMode>().is_err());
    }

    #[test]
    fn default_options_use_board_baud() {
        let opts = SerialOptions::default();
        assert_eq!(opts.baud, 9_600);
        assert_eq!(opts.dtr, DtrBehavior::Preserve);
    }

    #[test]
    fn port_info_display_includes_description() {
        let port = PortInfo {
            name: "/dev/ttyACM0".into(),
            description: "Arduino Mega 2341:0042".into(),
        };
        assert_eq!(port.to_string(), "/dev/ttyACM0 (Arduino Mega 2341:0042)");
    }
}
