use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{LinkConfig, PulseTiming};
use crate::dispatch::{Dispatcher, Status};
use crate::error::{DispatchError, Error};
use crate::link::{LinkManager, LinkState};
use crate::port::{SerialTransport, Transport};
use crate::proto::command::{Command, Direction};
use crate::proto::parser::{
    ArgumentError, coerce_seconds, coerce_speed, format_step, parse_direction,
    seconds_to_duration,
};
use crate::stats::Stats;

/// Pause between two commands of a sequence.
pub const SEQUENCE_GAP: Duration = Duration::from_millis(100);

/// Result of a tool-style [`RemoteController::run`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolReport {
    pub speed_change: Option<String>,
    pub movement: Option<String>,
}

impl fmt::Display for ToolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [self.speed_change.as_deref(), self.movement.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// A sequence that stopped early.
#[derive(Debug)]
pub struct SequenceError {
    /// Messages of the commands that completed before the failure.
    pub completed: Vec<String>,
    pub error: Error,
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sequence stopped after {} command(s): {}",
            self.completed.len(),
            self.error
        )
    }
}

impl std::error::Error for SequenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Remote control for the car: the only entry point callers use.
///
/// Every method blocks until its command has fully run, including the whole
/// duration of a timed move. Concurrent callers are served one at a time.
pub struct RemoteController<T: Transport = SerialTransport> {
    dispatcher: Dispatcher<T>,
}

impl RemoteController<SerialTransport> {
    /// Opens `port` right away. A failed open is logged, not returned; the
    /// first command retries.
    pub fn new(port: &str, baud: u32, timeout: Duration) -> Self {
        Self::with_config(LinkConfig::new(port, baud).with_timeout(timeout))
    }

    pub fn with_config(config: LinkConfig) -> Self {
        Self::with_transport(config, SerialTransport::new(), PulseTiming::default())
    }
}

impl<T: Transport> RemoteController<T> {
    pub fn with_transport(config: LinkConfig, transport: T, timing: PulseTiming) -> Self {
        info!(port = %config.port, baud = config.baud, "initializing remote controller");
        let mut link = LinkManager::new(config, transport);
        if let Err(e) = link.connect() {
            warn!(error = %e, "initial connect failed, will retry on first command");
        }
        Self {
            dispatcher: Dispatcher::new(link, timing),
        }
    }

    pub fn forward(&self, secs: f64) -> Result<String, Error> {
        self.move_for(Direction::Forward, secs)
    }

    pub fn backward(&self, secs: f64) -> Result<String, Error> {
        self.move_for(Direction::Backward, secs)
    }

    pub fn left(&self, secs: f64) -> Result<String, Error> {
        self.move_for(Direction::Left, secs)
    }

    pub fn right(&self, secs: f64) -> Result<String, Error> {
        self.move_for(Direction::Right, secs)
    }

    pub fn stop(&self) -> Result<String, Error> {
        self.send(Command::Stop)
    }

    pub fn set_speed(&self, level: i32) -> Result<String, Error> {
        self.send(Command::SetSpeed(level))
    }

    /// Moves in `direction` for `secs`. Zero or negative is a no-op.
    pub fn move_for(&self, direction: Direction, secs: f64) -> Result<String, Error> {
        let duration = seconds_to_duration(secs)?;
        self.send(Command::move_for(direction, duration))
    }

    pub fn execute(&self, command: Command) -> Result<Status, DispatchError> {
        self.dispatcher.execute(command)
    }

    /// Tool-style entry point for agent frameworks: a command name plus raw,
    /// possibly textual, duration and speed.
    ///
    /// All arguments are coerced before anything is sent. A speed is applied
    /// first, then the movement or stop.
    pub fn run(
        &self,
        command: &str,
        duration: Option<&str>,
        speed: Option<&str>,
    ) -> Result<ToolReport, Error> {
        let speed = speed.map(coerce_speed).transpose()?;
        let name = command.trim();
        let action = if name.eq_ignore_ascii_case("stop") {
            Command::Stop
        } else {
            let direction = parse_direction(name)
                .ok_or_else(|| ArgumentError::UnknownCommand(name.to_string()))?;
            let raw = duration.ok_or_else(|| ArgumentError::MissingDuration(name.to_string()))?;
            Command::move_for(direction, seconds_to_duration(coerce_seconds(raw)?)?)
        };

        let mut report = ToolReport::default();
        if let Some(level) = speed {
            report.speed_change = Some(self.send(Command::SetSpeed(level))?);
        }
        report.movement = Some(self.send(action)?);
        Ok(report)
    }

    /// Runs `commands` in order with a short gap between them. Each command
    /// takes the execution lock on its own.
    pub fn execute_sequence(&self, commands: &[Command]) -> Result<Vec<String>, SequenceError> {
        let steps: Vec<String> = commands.iter().map(format_step).collect();
        info!(steps = %steps.join(" "), "running sequence");
        let mut completed = Vec::with_capacity(commands.len());
        for (i, cmd) in commands.iter().enumerate() {
            if i > 0 {
                thread::sleep(SEQUENCE_GAP);
            }
            debug!(step = %steps[i], "sequence step");
            match self.send(*cmd) {
                Ok(msg) => completed.push(msg),
                Err(error) => return Err(SequenceError { completed, error }),
            }
        }
        Ok(completed)
    }

    pub fn link_state(&self) -> LinkState {
        self.dispatcher.link_state()
    }

    pub fn stats(&self) -> Stats {
        self.dispatcher.stats()
    }

    /// Releases the serial channel. A later command reopens it.
    pub fn close(&self) {
        self.dispatcher.close();
    }

    fn send(&self, command: Command) -> Result<String, Error> {
        match self.dispatcher.execute(command) {
            Ok(status) => Ok(status.to_string()),
            Err(e) => {
                warn!(?command, error = %e, "command failed");
                Err(e.into())
            }
        }
    }
}
