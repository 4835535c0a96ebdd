//! Remote control for a Bluetooth-serial toy car.
//!
//! Movement intents (move for N seconds, stop, set speed) become single ASCII
//! protocol bytes on a serial link: `U D L R` for movement, `X` to stop and
//! `0`-`9` for speed. Timed moves are sent as a pulse of the movement byte
//! every 100ms followed by a stop. Only one command runs at a time.
//!
//! Known residual risk: if the closing stop of a timed move cannot be
//! delivered (after the link's single retry) the car may keep moving. The
//! error is returned as [`DispatchError::LinkFailure`]; callers typically
//! log it and issue [`RemoteController::stop`] again.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod mock;
pub mod port;
pub mod proto;
pub mod stats;

pub use config::{LinkConfig, PulseTiming};
pub use controller::{RemoteController, SequenceError, ToolReport};
pub use dispatch::{Dispatcher, Status};
pub use error::{DispatchError, Error, LinkError};
pub use link::{LinkManager, LinkState};
pub use port::{SerialTransport, Transport};
pub use proto::{ArgumentError, Command, Direction};
pub use stats::Stats;
