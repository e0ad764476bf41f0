use std::thread;

use serialport::SerialPort;
use tracing::{debug, info, warn};

use crate::api::State;
use crate::config::{EventBinding, PollPolicy, WheelConfig};
use crate::transport::{self, Transport};
use crate::Error::{Closed, DeviceNotResponding, InvalidArgument};
use crate::Result;

/// Sent once after the port opens.
pub const INIT_COMMAND: u8 = 0xEE;
/// Every init or move is answered with this many bytes.
pub const ACK_LEN: usize = 2;
pub const MAX_SLOT: u8 = 9;
pub const MAX_SPEED: u8 = 7;
pub const DEFAULT_SPEED: u8 = 1;
pub const HOME_SLOT: u8 = 0;
pub const TOGGLE_VALUE: &str = "toggle";

/// Driver for a serial filter wheel.
///
/// The transport is released exactly once, by [`FilterWheel::close`] or, failing
/// that, when the wheel is dropped. Both paths home the wheel first.
pub struct FilterWheel<T: Transport = Box<dyn SerialPort>> {
    transport: Option<T>,
    position: u8,
    initialized: bool,
    poll: PollPolicy,
    binding: EventBinding,
}

impl FilterWheel<Box<dyn SerialPort>> {
    pub fn open(config: &WheelConfig) -> Result<Self> {
        let serial = transport::open_serial(&config.port, config.baud_rate)?;
        Self::with_transport(serial, config)
    }
}

impl<T: Transport> FilterWheel<T> {
    pub fn with_transport(transport: T, config: &WheelConfig) -> Result<Self> {
        let mut wheel = Self {
            transport: Some(transport),
            position: HOME_SLOT,
            initialized: false,
            poll: config.poll,
            binding: config.binding.clone(),
        };

        wheel.write(INIT_COMMAND)?;
        if config.initialize_on_open {
            wheel.initialize()?;
        } else {
            debug!("deferring handshake to first move");
        }

        Ok(wheel)
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn state(&self) -> State {
        State {
            position: self.position,
            initialized: self.initialized,
        }
    }

    pub fn move_to(&mut self, slot: u8, speed: u8) -> Result<State> {
        if slot > MAX_SLOT {
            return Err(InvalidArgument(format!(
                "slot {} is outside 0..={}",
                slot, MAX_SLOT
            )));
        }
        if speed > MAX_SPEED {
            return Err(InvalidArgument(format!(
                "speed {} is outside 0..={}",
                speed, MAX_SPEED
            )));
        }

        if slot == self.position {
            debug!(slot, "already in place");
            return Ok(self.state());
        }

        if !self.initialized {
            self.initialize()?;
        }

        self.write(command_byte(slot, speed))?;
        self.read(ACK_LEN)?;

        info!("moved {} => {} (speed {})", self.position, slot, speed);
        self.position = slot;
        Ok(self.state())
    }

    /// Alternate between slots 1 and 2; from anywhere else go to 1.
    pub fn toggle(&mut self) -> Result<State> {
        let target = match self.position {
            1 => 2,
            _ => 1,
        };
        self.move_to(target, DEFAULT_SPEED)
    }

    /// React to a configuration change published by another device.
    ///
    /// Only the bound device/property pair moves the wheel. Its value is either
    /// `toggle` or a 1-based channel number.
    pub fn handle_configuration_event(
        &mut self,
        device: &str,
        property: &str,
        value: &str,
    ) -> Result<State> {
        if !self.binding.matches(device, property) {
            return Ok(self.state());
        }

        if value == TOGGLE_VALUE {
            return self.toggle();
        }

        let channel = match value.parse::<i64>() {
            Ok(channel) => channel,
            Err(_) => {
                warn!(device, property, value, "ignoring unrecognized channel");
                return Ok(self.state());
            }
        };

        let slot = channel - 1;
        if !(0..=i64::from(MAX_SLOT)).contains(&slot) {
            return Err(InvalidArgument(format!(
                "channel {} is outside 1..={}",
                channel,
                MAX_SLOT + 1
            )));
        }
        self.move_to(slot as u8, DEFAULT_SPEED)
    }

    /// Home the wheel and release the connection.
    ///
    /// The connection is released even when homing fails; that error is then returned.
    pub fn close(mut self) -> Result<()> {
        let homed = self.home();
        drop(self.transport.take());
        info!("filter wheel closed");
        homed
    }

    fn home(&mut self) -> Result<()> {
        self.move_to(HOME_SLOT, DEFAULT_SPEED).map(|_| ())
    }

    fn initialize(&mut self) -> Result<()> {
        self.read(ACK_LEN)?;
        self.initialized = true;
        debug!("handshake complete");
        Ok(())
    }

    fn transport(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or(Closed)
    }

    fn write(&mut self, byte: u8) -> Result<()> {
        let transport = self.transport()?;
        transport.write_all(&[byte])?;
        transport.flush()?;
        debug!("wrote {:#04x}", byte);
        Ok(())
    }

    /// Wait until exactly `expected` bytes are buffered, then take them.
    fn read(&mut self, expected: usize) -> Result<Vec<u8>> {
        let poll = self.poll;
        let transport = self.transport()?;

        let mut available = 0;
        for attempt in 0..poll.attempts {
            available = transport.bytes_to_read()?;
            if available as usize == expected {
                let mut buf = vec![0u8; expected];
                transport.read_exact(&mut buf)?;
                debug!(attempt, "read {:02x?}", buf);
                return Ok(buf);
            }
            thread::sleep(poll.interval);
        }

        Err(DeviceNotResponding {
            expected,
            available,
            waited: poll.window(),
        })
    }
}

impl<T: Transport> Drop for FilterWheel<T> {
    fn drop(&mut self) {
        if self.transport.is_some() {
            debug!("dropping filter wheel without close");
            if let Err(e) = self.home() {
                warn!("failed to home filter wheel on drop: {}", e);
            }
        }
    }
}

/// Slot in the low nibble, speed above it.
pub fn command_byte(slot: u8, speed: u8) -> u8 {
    debug_assert!(slot <= MAX_SLOT && speed <= MAX_SPEED);
    slot + 16 * speed
}
