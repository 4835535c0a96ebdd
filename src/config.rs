use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(1);
pub const DEFAULT_WRITE_SPACING: Duration = Duration::from_millis(20);
pub const DEFAULT_REOPEN_DELAY: Duration = Duration::from_millis(500);

pub const DEFAULT_CADENCE: Duration = Duration::from_millis(100);
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// Serial link settings. Handed to the link manager once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub port: String,
    pub baud: u32,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// XON/XOFF. Hardware flow control lines are never driven by the firmware.
    pub software_flow_control: bool,
    /// Pause after a successful open before the first write.
    pub settle: Duration,
    /// Minimum gap the firmware needs between two commands.
    pub write_spacing: Duration,
    /// Pause between dropping a broken handle and re-opening the device.
    pub reopen_delay: Duration,
}

impl LinkConfig {
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            software_flow_control: true,
            settle: DEFAULT_SETTLE,
            write_spacing: DEFAULT_WRITE_SPACING,
            reopen_delay: DEFAULT_REOPEN_DELAY,
        }
    }

    /// Sets both read and write timeouts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self.write_timeout = timeout;
        self
    }

    pub fn with_software_flow_control(mut self, enabled: bool) -> Self {
        self.software_flow_control = enabled;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_write_spacing(mut self, spacing: Duration) -> Self {
        self.write_spacing = spacing;
        self
    }

    pub fn with_reopen_delay(mut self, delay: Duration) -> Self {
        self.reopen_delay = delay;
        self
    }
}

/// Timing of the pulse loop used for timed moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    /// Interval between two movement bytes.
    pub cadence: Duration,
    /// Sleep slice between cadence checks.
    pub tick: Duration,
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
            tick: DEFAULT_TICK,
        }
    }
}
