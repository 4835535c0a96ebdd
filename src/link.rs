//! Link manager: owns the one physical channel to the car.
//!
//! Reconnection is lazy. A write on a dead link triggers one connect, and a
//! failed write triggers one reconnect-and-retry. There is no background
//! health check.

use std::io;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::port::Transport;
use crate::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

pub struct LinkManager<T: Transport> {
    config: LinkConfig,
    transport: T,
    state: LinkState,
    stats: Stats,
}

impl<T: Transport> LinkManager<T> {
    /// Does not open the channel; call [`connect`](Self::connect) or let the
    /// first write do it.
    pub fn new(config: LinkConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            state: LinkState::Disconnected,
            stats: Stats::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Opens the channel, clears stale buffers and waits for the link to
    /// settle. Retry policy belongs to the caller.
    pub fn connect(&mut self) -> Result<(), LinkError> {
        self.transport.close();
        self.state = LinkState::Disconnected;

        let opened = self
            .transport
            .open(&self.config)
            .and_then(|()| self.transport.reset_buffers());
        if let Err(source) = opened {
            self.transport.close();
            error!(port = %self.config.port, error = %source, "could not connect");
            return Err(LinkError::ConnectFailed {
                port: self.config.port.clone(),
                source,
            });
        }

        thread::sleep(self.config.settle);
        self.state = LinkState::Connected;
        self.stats.inc_connect();
        info!(port = %self.config.port, baud = self.config.baud, "connected");
        Ok(())
    }

    /// Writes `bytes` after the inter-command spacing.
    ///
    /// A disconnected link gets exactly one connect attempt. A failed write
    /// gets exactly one reconnect-and-retry. Anything beyond that is returned
    /// to the caller and the link is left `Disconnected`.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.state == LinkState::Disconnected {
            if let Err(e) = self.connect() {
                warn!(port = %self.config.port, error = %e, "link unavailable");
                self.stats.inc_failure();
                return Err(LinkError::NotConnected {
                    port: self.config.port.clone(),
                });
            }
        }

        thread::sleep(self.config.write_spacing);
        let first = match self.send(bytes) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        warn!(port = %self.config.port, error = %first, "write failed, reconnecting");
        self.stats.inc_retry();
        if let Err(e) = self.reconnect() {
            warn!(error = %e, "reconnect failed");
            self.stats.inc_failure();
            return Err(LinkError::WriteFailed(first));
        }

        match self.send(bytes) {
            Ok(()) => {
                debug!("write succeeded after reconnect");
                Ok(())
            }
            Err(e) => {
                error!(port = %self.config.port, error = %e, "write failed after reconnect");
                self.transport.close();
                self.state = LinkState::Disconnected;
                self.stats.inc_failure();
                Err(LinkError::WriteFailed(e))
            }
        }
    }

    /// Idempotent.
    pub fn close(&mut self) {
        self.transport.close();
        if self.state == LinkState::Connected {
            info!(port = %self.config.port, "disconnected");
        }
        self.state = LinkState::Disconnected;
    }

    fn reconnect(&mut self) -> Result<(), LinkError> {
        self.transport.close();
        self.state = LinkState::Disconnected;
        thread::sleep(self.config.reopen_delay);
        self.stats.inc_reconnect();
        self.connect()
    }

    // A flush error after a successful write_all is retried like a write
    // error. The reconnect drops the output buffer, so the bytes are sent
    // again and the firmware may see them twice. Every protocol byte is safe
    // to repeat (a pulse or an idempotent stop/speed).
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.transport.write_all(bytes)?;
        self.transport.flush()?;
        self.stats.add_write(bytes.len());
        debug!(bytes = %String::from_utf8_lossy(bytes), "sent");
        Ok(())
    }
}

impl<T: Transport> Drop for LinkManager<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
