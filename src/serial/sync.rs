use bytes::BytesMut;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, StopBits};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use super::{
    ConnectionError, DtrBehavior, FailureKind, FlowControlMode, LineTransport, ParityMode,
    SerialOptions, StopBitsMode, MAX_LINE_BYTES,
};

const READ_CHUNK: usize = 256;

/// Line transport over a real serial device.
///
/// Reads never block: each poll only drains the bytes the driver already holds,
/// reassembles them into lines and hands out one line per call.
pub struct SerialTransport {
    device: String,
    options: SerialOptions,
    port: Option<Box<dyn serialport::SerialPort>>,
    codec: LinesCodec,
    buffer: BytesMut,
    lines: VecDeque<String>,
}

impl SerialTransport {
    pub fn new(device: impl Into<String>, options: SerialOptions) -> Self {
        Self {
            device: device.into(),
            options,
            port: None,
            codec: LinesCodec::new_with_max_length(MAX_LINE_BYTES),
            buffer: BytesMut::with_capacity(MAX_LINE_BYTES),
            lines: VecDeque::new(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn options(&self) -> SerialOptions {
        self.options
    }

    fn connect(&self, device: &str) -> Result<Box<dyn serialport::SerialPort>, ConnectionError> {
        if device.is_empty() {
            return Err(ConnectionError::new(
                device,
                FailureKind::Config,
                "device path cannot be empty",
            ));
        }

        let mut builder = serialport::new(device, self.options.baud)
            .data_bits(DataBits::Eight)
            .parity(to_serial_parity(self.options.parity))
            .stop_bits(to_serial_stop_bits(self.options.stop_bits))
            .flow_control(to_serial_flow(self.options.flow_control))
            .timeout(Duration::from_millis(self.options.timeout_ms));

        builder = match self.options.dtr {
            DtrBehavior::Preserve => builder,
            DtrBehavior::On => builder.dtr_on_open(true),
            DtrBehavior::Off => builder.dtr_on_open(false),
        };

        let port = builder
            .open()
            .map_err(|err| ConnectionError::from_serial(device, &err))?;
        // Drop whatever the board printed before we were listening.
        if let Err(err) = port.clear(ClearBuffer::Input) {
            debug!("could not clear input buffer on {device}: {err}");
        }
        Ok(port)
    }

    fn drop_link(&mut self, reason: &io::Error) {
        let err = ConnectionError::from_io(&self.device, reason);
        warn!(kind = %err.kind, "serial link lost: {err}");
        self.close();
    }

    /// Pull whatever bytes are waiting and split them into lines.
    fn fill(&mut self) {
        let Some(port) = self.port.as_mut() else {
            return;
        };
        let pending = match port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(err) => {
                let err = io::Error::other(err);
                self.drop_link(&err);
                return;
            }
        };
        if pending == 0 {
            return;
        }

        let mut chunk = [0u8; READ_CHUNK];
        let want = pending.min(READ_CHUNK);
        match port.read(&mut chunk[..want]) {
            Ok(0) => {}
            Ok(read) => self.buffer.extend_from_slice(&chunk[..read]),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => {}
            Err(err) => {
                self.drop_link(&err);
                return;
            }
        }
        self.split_lines();
    }

    fn split_lines(&mut self) {
        loop {
            match self.codec.decode(&mut self.buffer) {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        self.lines.push_back(line.to_string());
                    }
                }
                Ok(None) => break,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!("inbound line exceeds {MAX_LINE_BYTES} bytes; discarding");
                }
                Err(LinesCodecError::Io(err)) => {
                    debug!("dropping undecodable inbound line: {err}");
                }
            }
        }
    }
}

impl LineTransport for SerialTransport {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn open(&mut self, port: Option<&str>) -> Result<(), ConnectionError> {
        if self.is_open() {
            self.close();
        }
        if let Some(device) = port {
            self.device = device.to_string();
        }
        let handle = self.connect(&self.device)?;
        self.port = Some(handle);
        info!(device = %self.device, baud = self.options.baud, "serial connected");
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!(device = %self.device, "serial disconnected");
        }
        self.buffer.clear();
        self.lines.clear();
        self.codec = LinesCodec::new_with_max_length(MAX_LINE_BYTES);
    }

    fn poll_line(&mut self) -> Option<String> {
        if self.lines.is_empty() {
            self.fill();
        }
        self.lines.pop_front()
    }

    fn send_line(&mut self, text: &str) {
        let Some(port) = self.port.as_mut() else {
            debug!("not connected; dropping outbound line {text:?}");
            return;
        };
        let mut buf = Vec::with_capacity(text.len() + 1);
        buf.extend_from_slice(text.as_bytes());
        buf.push(b'\n');
        let result = port.write_all(&buf).and_then(|()| port.flush());
        match result {
            Ok(()) => debug!("-> {text}"),
            Err(err) => self.drop_link(&err),
        }
    }
}

fn to_serial_flow(mode: FlowControlMode) -> FlowControl {
    match mode {
        FlowControlMode::None => FlowControl::None,
        FlowControlMode::Software => FlowControl::Software,
        FlowControlMode::Hardware => FlowControl::Hardware,
    }
}

fn to_serial_parity(mode: ParityMode) -> Parity {
    match mode {
        ParityMode::None => Parity::None,
        ParityMode::Odd => Parity::Odd,
        ParityMode::Even => Parity::Even,
    }
}

fn to_serial_stop_bits(mode: StopBitsMode) -> StopBits {
    match mode {
        StopBitsMode::One => StopBits::One,
        StopBitsMode::Two => StopBits::Two,
    }
}
