use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::Error;

/// Observable state of the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub position: u8,
    pub initialized: bool,
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "position {}", self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move { slot: u8, speed: u8 },
    Toggle,
    Configure(ConfigEvent),
    Close,
}

/// A configuration-changed notification from the event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEvent {
    pub device: String,
    pub property: String,
    pub value: String,
}

impl ConfigEvent {
    pub fn new(device: &str, property: &str, value: &str) -> Self {
        Self {
            device: device.to_string(),
            property: property.to_string(),
            value: value.to_string(),
        }
    }
}

/// Text form: `<device> <property> <value>`
impl FromStr for ConfigEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
            (Some(device), Some(property), Some(value), None) => {
                Ok(ConfigEvent::new(device, property, value))
            }
            _ => Err(Error::InvalidEvent(format!(
                "expected '<device> <property> <value>', got '{}'",
                s.trim()
            ))),
        }
    }
}

impl Display for ConfigEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.device, self.property, self.value)
    }
}
