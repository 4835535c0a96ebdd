//! Command dispatcher.
//!
//! The link manager lives behind a mutex that doubles as the execution lock:
//! it is held for the whole lifetime of a command, including every pulse of a
//! timed move, so two moves can never interleave on the wire. Waiters are
//! served in whatever order the lock hands it out. A running move cannot be
//! interrupted; a later `stop` waits for it to finish.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::PulseTiming;
use crate::error::DispatchError;
use crate::link::{LinkManager, LinkState};
use crate::port::Transport;
use crate::proto::command::{Command, Direction, MAX_SPEED, MIN_SPEED, STOP_BYTE};
use crate::stats::Stats;

/// Outcome of one executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Timed move ran to its end and the closing stop was delivered.
    Completed {
        direction: Direction,
        /// Pulses that reached the link.
        pulses: u32,
        /// Pulses lost to link errors.
        dropped: u32,
    },
    /// Zero or negative duration; nothing was sent.
    Skipped { direction: Direction },
    Stopped,
    SpeedSet(u8),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Completed { direction, .. } => write!(f, "{} complete", direction.label()),
            Status::Skipped { direction } => {
                write!(f, "{} skipped (no duration)", direction.label())
            }
            Status::Stopped => f.write_str("Stop complete"),
            Status::SpeedSet(level) => write!(f, "Speed set to {level}"),
        }
    }
}

pub struct Dispatcher<T: Transport> {
    link: Mutex<LinkManager<T>>,
    timing: PulseTiming,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(link: LinkManager<T>, timing: PulseTiming) -> Self {
        Self {
            link: Mutex::new(link),
            timing,
        }
    }

    /// Runs one command to completion. Blocks while another command holds
    /// the link.
    pub fn execute(&self, command: Command) -> Result<Status, DispatchError> {
        // Rejected before waiting on the lock: invalid input never queues.
        let Some(byte) = command.protocol_byte() else {
            warn!(?command, "speed out of range");
            return Err(DispatchError::InvalidArgument(format!(
                "speed must be between {MIN_SPEED} and {MAX_SPEED}, got {command:?}"
            )));
        };

        let mut link = self.lock();
        match command {
            Command::Move {
                direction,
                duration,
            } => self.pulse(&mut link, direction, byte, duration),
            Command::Stop => {
                info!("stopping");
                link.write(&[byte])?;
                Ok(Status::Stopped)
            }
            Command::SetSpeed(_) => {
                let level = byte - b'0';
                info!(level, "setting speed");
                link.write(&[byte])?;
                Ok(Status::SpeedSet(level))
            }
        }
    }

    /// Link state. Waits for any running command to finish.
    pub fn link_state(&self) -> LinkState {
        self.lock().state()
    }

    pub fn stats(&self) -> Stats {
        self.lock().stats().clone()
    }

    pub fn close(&self) {
        self.lock().close();
    }

    // A caller that panicked mid-command leaves the link in a valid state.
    fn lock(&self) -> MutexGuard<'_, LinkManager<T>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends the direction byte every `cadence` until `duration` has elapsed,
    /// then always sends a stop, even if pulses were lost.
    fn pulse(
        &self,
        link: &mut LinkManager<T>,
        direction: Direction,
        byte: u8,
        duration: Duration,
    ) -> Result<Status, DispatchError> {
        if duration.is_zero() {
            debug!(%direction, "zero duration, nothing to do");
            return Ok(Status::Skipped { direction });
        }

        info!(%direction, secs = duration.as_secs_f64(), "moving");
        let start = Instant::now();
        let mut last_pulse: Option<Instant> = None;
        let mut pulses = 0u32;
        let mut dropped = 0u32;

        while start.elapsed() < duration {
            let now = Instant::now();
            if last_pulse.is_none_or(|t| now.duration_since(t) >= self.timing.cadence) {
                last_pulse = Some(now);
                match link.write(&[byte]) {
                    Ok(()) => pulses += 1,
                    Err(e) => {
                        dropped += 1;
                        warn!(%direction, error = %e, "pulse dropped");
                    }
                }
            }
            thread::sleep(self.timing.tick);
        }

        if let Err(e) = link.write(&[STOP_BYTE]) {
            error!(%direction, pulses, error = %e, "stop after move failed");
            return Err(DispatchError::LinkFailure(e));
        }
        info!(%direction, pulses, dropped, "move complete");
        Ok(Status::Completed {
            direction,
            pulses,
            dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use super::*;
    use crate::config::LinkConfig;
    use crate::error::LinkError;
    use crate::mock::{Failures, MockTransport};

    fn dispatcher(spacing: Duration) -> (Dispatcher<MockTransport>, MockTransport) {
        let mock = MockTransport::new();
        let cfg = LinkConfig::new("mock0", 115_200)
            .with_settle(Duration::ZERO)
            .with_reopen_delay(Duration::ZERO)
            .with_write_spacing(spacing);
        let mut link = LinkManager::new(cfg, mock.clone());
        link.connect().unwrap();
        (Dispatcher::new(link, PulseTiming::default()), mock)
    }

    fn count(bytes: &[u8], b: u8) -> usize {
        bytes.iter().filter(|&&x| x == b).count()
    }

    #[test]
    fn timed_move_pulses_then_stops() {
        let (d, mock) = dispatcher(Duration::from_millis(20));
        let cmd = Command::move_for(Direction::Forward, Duration::from_millis(250));
        let status = d.execute(cmd).unwrap();

        let written = mock.written();
        let ups = count(&written, b'U');
        assert!((2..=3).contains(&ups), "got {ups} pulses: {written:?}");
        assert_eq!(count(&written, b'X'), 1);
        assert_eq!(written.last(), Some(&b'X'));
        assert!(written[..written.len() - 1].iter().all(|&b| b == b'U'));
        assert!(matches!(
            status,
            Status::Completed { direction: Direction::Forward, pulses, dropped: 0 } if pulses as usize == ups
        ));
        assert_eq!(status.to_string(), "Forward complete");
    }

    #[test]
    fn every_direction_uses_its_byte() {
        let (d, mock) = dispatcher(Duration::ZERO);
        for dir in Direction::ALL {
            mock.clear_written();
            d.execute(Command::move_for(dir, Duration::from_millis(50)))
                .unwrap();
            let written = mock.written();
            assert_eq!(written.first(), Some(&dir.protocol_byte()));
            assert_eq!(written.last(), Some(&STOP_BYTE));
            assert_eq!(count(&written, STOP_BYTE), 1);
        }
    }

    #[test]
    fn zero_duration_sends_nothing() {
        let (d, mock) = dispatcher(Duration::ZERO);
        let status = d
            .execute(Command::move_for(Direction::Left, Duration::ZERO))
            .unwrap();
        assert_eq!(
            status,
            Status::Skipped {
                direction: Direction::Left
            }
        );
        assert!(mock.written().is_empty());
    }

    #[test]
    fn speed_writes_single_digit() {
        let (d, mock) = dispatcher(Duration::ZERO);
        for level in 0..=9 {
            mock.clear_written();
            let status = d.execute(Command::SetSpeed(level)).unwrap();
            assert_eq!(status, Status::SpeedSet(level as u8));
            assert_eq!(mock.written(), vec![b'0' + level as u8]);
        }
    }

    #[test]
    fn invalid_speed_never_reaches_wire() {
        let (d, mock) = dispatcher(Duration::ZERO);
        for level in [12, 10, -1, i32::MIN] {
            let err = d.execute(Command::SetSpeed(level)).unwrap_err();
            assert!(matches!(err, DispatchError::InvalidArgument(_)));
        }
        assert!(mock.written().is_empty());
        assert_eq!(d.stats().writes, 0);
    }

    #[test]
    fn repeated_stop_is_fine() {
        let (d, mock) = dispatcher(Duration::ZERO);
        for _ in 0..3 {
            assert_eq!(d.execute(Command::Stop).unwrap(), Status::Stopped);
        }
        assert_eq!(mock.written(), b"XXX");
    }

    #[test]
    fn stop_on_dead_link_is_an_error() {
        let (d, mock) = dispatcher(Duration::ZERO);
        mock.fail_writes(Failures::Always);
        let err = d.execute(Command::Stop).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Link(LinkError::WriteFailed(_) | LinkError::NotConnected { .. })
        ));
        // Next attempt finds no device at all.
        mock.fail_opens(Failures::Always);
        let err = d.execute(Command::Stop).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Link(LinkError::NotConnected { .. })
        ));
        assert!(mock.written().is_empty());
    }

    #[test]
    fn failed_final_stop_is_link_failure() {
        let (d, mock) = dispatcher(Duration::ZERO);
        mock.fail_writes(Failures::Always);
        let err = d
            .execute(Command::move_for(Direction::Backward, Duration::from_millis(120)))
            .unwrap_err();
        assert!(matches!(err, DispatchError::LinkFailure(_)));
    }

    #[test]
    fn dropped_pulse_still_ends_with_stop() {
        let (d, mock) = dispatcher(Duration::ZERO);
        // first pulse and its retry both fail
        mock.fail_writes(Failures::Next(2));
        let status = d
            .execute(Command::move_for(Direction::Right, Duration::from_millis(150)))
            .unwrap();
        match status {
            Status::Completed { dropped, .. } => assert_eq!(dropped, 1),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(mock.written().last(), Some(&STOP_BYTE));
        assert_eq!(d.link_state(), LinkState::Connected);
    }

    #[test]
    fn recovers_after_write_failure() {
        let (d, mock) = dispatcher(Duration::ZERO);
        mock.fail_writes(Failures::Next(2));
        assert!(d.execute(Command::Stop).is_err());
        assert_eq!(d.link_state(), LinkState::Disconnected);

        assert_eq!(d.execute(Command::SetSpeed(4)).unwrap(), Status::SpeedSet(4));
        assert_eq!(d.link_state(), LinkState::Connected);
        assert_eq!(mock.written(), b"4");
    }

    #[test]
    fn concurrent_moves_do_not_interleave() {
        let (d, mock) = dispatcher(Duration::ZERO);
        let d = Arc::new(d);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [Direction::Forward, Direction::Backward]
            .into_iter()
            .map(|dir| {
                let d = Arc::clone(&d);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    d.execute(Command::move_for(dir, Duration::from_millis(300)))
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap().is_ok());
        }

        let written = mock.written();
        // collapse runs: expect one block of pulses + X per move
        let mut runs: Vec<u8> = Vec::new();
        for &b in &written {
            if runs.last() != Some(&b) {
                runs.push(b);
            }
        }
        assert!(
            runs == b"UXDX" || runs == b"DXUX",
            "interleaved pulses: {:?}",
            String::from_utf8_lossy(&written)
        );
    }
}
