use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use car_remote::{LinkConfig, PulseTiming};

#[derive(Parser, Debug, Clone)]
#[command(name = "car-remote", about = "Drive the toy car over its Bluetooth serial link")]
pub struct Cli {
    #[command(flatten)]
    pub ser: SerialOpts,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Move forward for a number of seconds
    Forward(MoveOpts),
    /// Move backward for a number of seconds
    Backward(MoveOpts),
    /// Turn left for a number of seconds
    Left(MoveOpts),
    /// Turn right for a number of seconds
    Right(MoveOpts),
    /// Stop the car
    Stop,
    /// Set speed (0-9)
    Speed {
        #[arg(allow_negative_numbers = true)]
        level: String,
    },
    /// Tool-style call: command name plus optional duration and speed
    Run {
        /// forward, backward, left, right or stop
        command: String,
        #[arg(long)]
        duration: Option<String>,
        #[arg(long)]
        speed: Option<String>,
    },
    /// Run steps in order, e.g. `speed=5 forward=2 left=0.5 stop`
    Seq {
        #[arg(required = true)]
        steps: Vec<String>,
    },
    /// Interactive test console
    Console,
}

#[derive(Args, Debug, Clone)]
pub struct MoveOpts {
    /// Seconds; text with an embedded number ("2.5s") is accepted, zero or
    /// negative does nothing
    #[arg(allow_negative_numbers = true)]
    pub secs: String,
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path
    #[arg(long, env = "CAR_REMOTE_PORT", default_value = "/dev/rfcomm0", global = true)]
    pub dev: String,
    /// Baud rate
    #[arg(long, env = "CAR_REMOTE_BAUD", default_value_t = 115_200, global = true)]
    pub baud: u32,
    /// Write timeout in milliseconds (the serial port has a single timeout)
    #[arg(long, default_value_t = 1000, global = true)]
    pub timeout_ms: u64,
    /// Disable XON/XOFF software flow control
    #[arg(long, default_value_t = false, global = true)]
    pub no_xonxoff: bool,
    /// Pause after opening the port before the first write
    #[arg(long, default_value_t = 1000, global = true)]
    pub settle_ms: u64,
    /// Minimum gap between two commands on the wire
    #[arg(long, default_value_t = 20, global = true)]
    pub spacing_ms: u64,
    /// Pause before re-opening the port after a failed write
    #[arg(long, default_value_t = 500, global = true)]
    pub reopen_ms: u64,
    /// Interval between movement pulses
    #[arg(long, default_value_t = 100, global = true)]
    pub cadence_ms: u64,
    /// Sleep slice of the pulse loop
    #[arg(long, default_value_t = 10, global = true)]
    pub tick_ms: u64,
}

impl SerialOpts {
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::new(&self.dev, self.baud)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_software_flow_control(!self.no_xonxoff)
            .with_settle(Duration::from_millis(self.settle_ms))
            .with_write_spacing(Duration::from_millis(self.spacing_ms))
            .with_reopen_delay(Duration::from_millis(self.reopen_ms))
    }

    pub fn pulse_timing(&self) -> PulseTiming {
        PulseTiming {
            cadence: Duration::from_millis(self.cadence_ms),
            tick: Duration::from_millis(self.tick_ms),
        }
    }
}
