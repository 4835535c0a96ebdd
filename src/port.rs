use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Write};

use crate::config::LinkConfig;

/// Byte channel the link manager drives. Anything serial-like (a real device,
/// a mock, a network bridge) can stand behind it.
pub trait Transport: Send {
    fn open(&mut self, config: &LinkConfig) -> io::Result<()>;
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
    /// Drops stale input and output left over from a previous session.
    fn reset_buffers(&mut self) -> io::Result<()>;
    /// Releases the channel. Must be idempotent.
    fn close(&mut self);
}

/// Serial device (USB adapter or `/dev/rfcomm*` Bluetooth bind).
#[derive(Default)]
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn port_mut(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port not open"))
    }
}

pub fn open_port(config: &LinkConfig) -> io::Result<Box<dyn SerialPort>> {
    // serialport has a single timeout; the core only writes.
    let builder = serialport::new(&config.port, config.baud)
        .timeout(config.write_timeout)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(if config.software_flow_control {
            FlowControl::Software
        } else {
            FlowControl::None
        });

    builder.open().map_err(|e| {
        let msg = format!("open {}: {}", config.port, e);
        io::Error::new(io::Error::from(e).kind(), msg)
    })
}

impl Transport for SerialTransport {
    fn open(&mut self, config: &LinkConfig) -> io::Result<()> {
        self.port = Some(open_port(config)?);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port_mut()?.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port_mut()?.flush()
    }

    fn reset_buffers(&mut self) -> io::Result<()> {
        self.port_mut()?.clear(ClearBuffer::All).map_err(io::Error::from)
    }

    fn close(&mut self) {
        // Dropping the handle closes the device.
        self.port = None;
    }
}
