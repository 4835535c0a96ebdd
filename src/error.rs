use std::io;

use thiserror::Error;

use crate::proto::parser::ArgumentError;

#[derive(Debug, Error)]
pub enum LinkError {
    /// The device could not be opened (bad port, device absent, busy).
    #[error("could not connect to {port}: {source}")]
    ConnectFailed {
        port: String,
        #[source]
        source: io::Error,
    },
    /// No active link and the reconnect attempt failed as well.
    #[error("not connected to {port}")]
    NotConnected { port: String },
    /// Write or flush failed, and so did the single retry.
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Rejected before anything reached the wire.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A single-shot command (stop, speed) could not be written.
    #[error(transparent)]
    Link(#[from] LinkError),
    /// The Stop that ends a timed move could not be written. The car may
    /// still be moving.
    #[error("stop after timed move failed, vehicle may still be moving: {0}")]
    LinkFailure(#[source] LinkError),
}

/// Error returned by the public [`RemoteController`](crate::RemoteController) surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Error::Dispatch(DispatchError::Link(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_failure_message_warns_about_motion() {
        let e = DispatchError::LinkFailure(LinkError::NotConnected {
            port: "/dev/rfcomm0".into(),
        });
        let msg = e.to_string();
        assert!(msg.contains("may still be moving"));
        assert!(msg.contains("/dev/rfcomm0"));
    }

    #[test]
    fn single_shot_link_errors_pass_through() {
        let e: DispatchError =
            LinkError::WriteFailed(io::Error::new(io::ErrorKind::TimedOut, "timed out")).into();
        assert_eq!(e.to_string(), "write failed: timed out");
        assert!(matches!(e, DispatchError::Link(LinkError::WriteFailed(_))));
    }
}
