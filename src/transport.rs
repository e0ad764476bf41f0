use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use crate::{Error, Result};

/// A byte stream to the wheel that can report how much it has buffered.
pub trait Transport: Read + Write + Send {
    fn bytes_to_read(&mut self) -> Result<u32>;
}

impl Transport for Box<dyn SerialPort> {
    fn bytes_to_read(&mut self) -> Result<u32> {
        Ok(SerialPort::bytes_to_read(&**self)?)
    }
}

pub fn open_serial(port: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>> {
    let serial = serialport::new(port, baud_rate)
        .data_bits(DataBits::Eight)
        .flow_control(FlowControl::None)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(100))
        .open()
        .map_err(|source| Error::Connection {
            port: port.to_string(),
            source,
        })?;

    info!(port, baud_rate, "serial port open");
    Ok(serial)
}
