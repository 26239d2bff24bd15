use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;

/// High-level reason a serial link could not be opened or was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PermissionDenied,
    DeviceMissing,
    Disconnected,
    Timeout,
    Busy,
    Config,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::PermissionDenied => "permission_denied",
            FailureKind::DeviceMissing => "device_missing",
            FailureKind::Disconnected => "disconnected",
            FailureKind::Timeout => "timeout",
            FailureKind::Busy => "busy",
            FailureKind::Config => "config",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to open (or keep) the serial link. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("connection to '{device}' failed ({kind}): {message}")]
pub struct ConnectionError {
    pub device: String,
    pub kind: FailureKind,
    pub message: String,
}

impl ConnectionError {
    pub fn new(device: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn from_serial(device: &str, err: &serialport::Error) -> Self {
        Self::new(device, classify_serial_error(err), err.to_string())
    }

    pub fn from_io(device: &str, err: &std::io::Error) -> Self {
        Self::new(device, classify_io_error(err), err.to_string())
    }
}

/// Classify an error returned by the `serialport` crate.
pub fn classify_serial_error(err: &serialport::Error) -> FailureKind {
    match err.kind() {
        serialport::ErrorKind::NoDevice => FailureKind::DeviceMissing,
        serialport::ErrorKind::InvalidInput => FailureKind::Config,
        serialport::ErrorKind::Io(kind) => classify_io_kind(kind, None),
        serialport::ErrorKind::Unknown => FailureKind::Unknown,
    }
}

/// Classify an std::io::Error into a failure reason.
pub fn classify_io_error(err: &std::io::Error) -> FailureKind {
    classify_io_kind(err.kind(), err.raw_os_error())
}

fn classify_io_kind(kind: ErrorKind, raw_os_error: Option<i32>) -> FailureKind {
    match kind {
        ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
        ErrorKind::NotFound => FailureKind::DeviceMissing,
        ErrorKind::TimedOut | ErrorKind::WouldBlock => FailureKind::Timeout,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            FailureKind::Disconnected
        }
        ErrorKind::InvalidInput => FailureKind::Config,
        _ => match raw_os_error {
            // 13 = EACCES, 16 = EBUSY, 19 = ENODEV, 6 = ENXIO, 5 = EIO, 110 = ETIMEDOUT
            Some(13) => FailureKind::PermissionDenied,
            Some(16) => FailureKind::Busy,
            Some(19) | Some(6) => FailureKind::DeviceMissing,
            Some(5) => FailureKind::Disconnected,
            Some(110) => FailureKind::Timeout,
            _ => FailureKind::Unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_permission_denied() {
        let err = std::io::Error::new(ErrorKind::PermissionDenied, "denied");
        assert_eq!(classify_io_error(&err), FailureKind::PermissionDenied);
    }

    #[test]
    fn classify_timeout_and_broken_pipe() {
        let timeout = std::io::Error::new(ErrorKind::TimedOut, "timeout");
        assert_eq!(classify_io_error(&timeout), FailureKind::Timeout);
        let broken = std::io::Error::new(ErrorKind::BrokenPipe, "broken");
        assert_eq!(classify_io_error(&broken), FailureKind::Disconnected);
    }

    #[test]
    fn classify_raw_os_codes() {
        let busy = std::io::Error::from_raw_os_error(16);
        assert_eq!(classify_io_error(&busy), FailureKind::Busy);
    }

    #[test]
    fn classify_serialport_errors() {
        let missing = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        assert_eq!(classify_serial_error(&missing), FailureKind::DeviceMissing);
        let bad = serialport::Error::new(serialport::ErrorKind::InvalidInput, "baud");
        let err = ConnectionError::from_serial("/dev/ttyACM0", &bad);
        assert_eq!(err.kind, FailureKind::Config);
        assert!(err.to_string().contains("/dev/ttyACM0"));
    }
}
