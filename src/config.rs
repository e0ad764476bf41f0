use std::time::Duration;

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 128_000;
pub const DEFAULT_POLL_ATTEMPTS: u32 = 100;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const DEFAULT_EVENT_DEVICE: &str = "561_AOTF";
pub const DEFAULT_EVENT_PROPERTY: &str = "Channel";

/// Everything needed to bring up a wheel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Block on the startup handshake instead of deferring it to the first move
    pub initialize_on_open: bool,
    pub poll: PollPolicy,
    pub binding: EventBinding,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            initialize_on_open: true,
            poll: PollPolicy::default(),
            binding: EventBinding::default(),
        }
    }
}

/// Bounded wait for an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    /// Upper bound on how long a read may block.
    pub fn window(&self) -> Duration {
        self.interval * self.attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_POLL_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The (device, property) pair whose configuration events move the wheel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub device: String,
    pub property: String,
}

impl EventBinding {
    pub fn matches(&self, device: &str, property: &str) -> bool {
        self.device == device && self.property == property
    }
}

impl Default for EventBinding {
    fn default() -> Self {
        Self {
            device: DEFAULT_EVENT_DEVICE.to_string(),
            property: DEFAULT_EVENT_PROPERTY.to_string(),
        }
    }
}
