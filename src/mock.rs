//! In-memory [`Transport`] for tests and dry runs.
//!
//! Every byte written is recorded; opens and writes can be scripted to fail.
//! Clones share state, so a test can keep a handle after moving the transport
//! into a controller.

use std::io;
use std::sync::{Arc, Mutex};

use crate::config::LinkConfig;
use crate::port::Transport;

/// How many upcoming calls should fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Failures {
    #[default]
    None,
    Next(u32),
    Always,
}

impl Failures {
    fn take(&mut self) -> bool {
        match *self {
            Failures::None => false,
            Failures::Always => true,
            Failures::Next(n) => {
                *self = if n > 1 {
                    Failures::Next(n - 1)
                } else {
                    Failures::None
                };
                n > 0
            }
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    open: bool,
    opens: u32,
    resets: u32,
    written: Vec<u8>,
    open_failures: Failures,
    write_failures: Failures,
    flush_failures: Failures,
}

#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    /// Bytes that reached the "wire", in order.
    pub fn written(&self) -> Vec<u8> {
        self.with_state(|s| s.written.clone())
    }

    pub fn clear_written(&self) {
        self.with_state(|s| s.written.clear());
    }

    pub fn is_open(&self) -> bool {
        self.with_state(|s| s.open)
    }

    /// Successful opens so far.
    pub fn opens(&self) -> u32 {
        self.with_state(|s| s.opens)
    }

    pub fn resets(&self) -> u32 {
        self.with_state(|s| s.resets)
    }

    pub fn fail_opens(&self, failures: Failures) {
        self.with_state(|s| s.open_failures = failures);
    }

    pub fn fail_writes(&self, failures: Failures) {
        self.with_state(|s| s.write_failures = failures);
    }

    /// Flush failures happen after the bytes were already recorded.
    pub fn fail_flushes(&self, failures: Failures) {
        self.with_state(|s| s.flush_failures = failures);
    }
}

impl Transport for MockTransport {
    fn open(&mut self, config: &LinkConfig) -> io::Result<()> {
        self.with_state(|s| {
            if s.open_failures.take() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("open {}: no such device", config.port),
                ));
            }
            s.open = true;
            s.opens += 1;
            Ok(())
        })
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.with_state(|s| {
            if !s.open {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "port closed"));
            }
            if s.write_failures.take() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out"));
            }
            s.written.extend_from_slice(bytes);
            Ok(())
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_state(|s| {
            if s.flush_failures.take() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "flush failed"));
            }
            Ok(())
        })
    }

    fn reset_buffers(&mut self) -> io::Result<()> {
        self.with_state(|s| s.resets += 1);
        Ok(())
    }

    fn close(&mut self) {
        self.with_state(|s| s.open = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_count_down() {
        let mut f = Failures::Next(2);
        assert!(f.take());
        assert!(f.take());
        assert!(!f.take());
        assert_eq!(f, Failures::None);

        let mut always = Failures::Always;
        assert!(always.take());
        assert!(always.take());
    }

    #[test]
    fn clones_share_recorded_bytes() {
        let handle = MockTransport::new();
        let mut t = handle.clone();
        t.open(&LinkConfig::new("mock", 9600)).unwrap();
        t.write_all(b"UX").unwrap();
        assert_eq!(handle.written(), b"UX");
        assert!(handle.is_open());
        t.close();
        assert!(!handle.is_open());
        assert!(t.write_all(b"U").is_err());
    }

    #[test]
    fn scripted_write_failure_records_nothing() {
        let handle = MockTransport::new();
        let mut t = handle.clone();
        t.open(&LinkConfig::new("mock", 9600)).unwrap();
        handle.fail_writes(Failures::Next(1));
        assert_eq!(
            t.write_all(b"U").unwrap_err().kind(),
            io::ErrorKind::TimedOut
        );
        t.write_all(b"D").unwrap();
        assert_eq!(handle.written(), b"D");
    }
}
