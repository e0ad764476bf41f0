use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use git_version::git_version;

use crate::config::{EventBinding, PollPolicy, WheelConfig};

const GIT_VERSION: &str = git_version!(args = ["--always", "--dirty=-modified"], fallback = "unknown");

/// Websocket controller for a serial filter wheel.
#[derive(Parser, Debug)]
#[clap(name = "Wheelman", version = GIT_VERSION)]
pub struct Opts {
    /// Serial port the wheel is attached to
    #[clap(long, default_value = "/dev/ttyUSB0")]
    pub port: String,

    #[clap(long, default_value = "128000")]
    pub baud_rate: u32,

    /// Defer the startup handshake to the first move
    #[clap(long)]
    pub defer_init: bool,

    #[clap(long, default_value = "100")]
    pub poll_attempts: u32,

    #[clap(long, default_value = "10")]
    pub poll_interval_ms: u64,

    /// Device whose configuration events move the wheel
    #[clap(long, default_value = "561_AOTF")]
    pub event_device: String,

    #[clap(long, default_value = "Channel")]
    pub event_property: String,

    /// Drive an in-memory wheel instead of a serial port
    #[clap(long)]
    pub simulate: bool,

    #[clap(long, default_value = "127.0.0.1")]
    pub address: NetInterface,

    #[clap(long, default_value = "9000")]
    pub listen_port: u16,

    /// Used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    pub log_level: String,
}

impl Opts {
    pub fn wheel_config(&self) -> WheelConfig {
        WheelConfig {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            initialize_on_open: !self.defer_init,
            poll: PollPolicy {
                attempts: self.poll_attempts,
                interval: Duration::from_millis(self.poll_interval_ms),
            },
            binding: EventBinding {
                device: self.event_device.clone(),
                property: self.event_property.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetInterface {
    Loopback,
    OOOO,
}

impl FromStr for NetInterface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "127.0.0.1" => Ok(NetInterface::Loopback),
            "0.0.0.0" => Ok(NetInterface::OOOO),
            unsupported => Err(format!("{} is not a valid interface", unsupported)),
        }
    }
}

impl From<NetInterface> for [u8; 4] {
    fn from(i: NetInterface) -> Self {
        match i {
            NetInterface::Loopback => [127, 0, 0, 1],
            NetInterface::OOOO => [0, 0, 0, 0],
        }
    }
}
