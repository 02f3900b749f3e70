//! Host-side serial port.
//!
//! `serialport` opens the line raw at the requested baud rate, so this
//! channel never translates bytes and has no mode to switch.

use link_protocol::{Channel, ChannelAttrs, LinkError, LinkResult};
use log::debug;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Baud rate the dumper's UART runs at unless told otherwise.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    pub fn open(node: &str, baud_rate: u32, timeout: Duration) -> LinkResult<Self> {
        let port = serialport::new(node, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|err| LinkError::open(node, io::Error::from(err)))?;
        debug!("opened {node} at {baud_rate} baud, {timeout:?} read timeout");
        Ok(Self { port })
    }
}

impl Channel for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> LinkResult<usize> {
        Ok(self.port.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> LinkResult<usize> {
        Ok(self.port.write(buf)?)
    }

    fn attributes(&mut self) -> LinkResult<ChannelAttrs> {
        Ok(ChannelAttrs::default().with_raw(true))
    }

    fn set_attributes(&mut self, _attrs: ChannelAttrs) -> LinkResult<()> {
        Ok(())
    }

    fn close(&mut self) -> LinkResult<()> {
        Ok(self.port.flush()?)
    }
}
