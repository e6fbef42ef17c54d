use std::io::ErrorKind;

use nsqwire_protocol::{Command, ProtocolError};

/// Errors that can occur on an NSQ connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to establish the TCP connection.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the stream. Timeouts surface here.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream before a read could be satisfied.
    #[error("connection closed ({buffered} of {needed} bytes buffered)")]
    ConnectionClosed { needed: usize, buffered: usize },

    /// The connection already failed and must be replaced.
    #[error("connection is closed")]
    Closed,

    /// The frame size prefix is negative.
    #[error("invalid frame size {0}")]
    InvalidFrameSize(i32),

    /// The frame size prefix exceeds the configured maximum.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A complete frame could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    /// True when a blocking operation gave up after the configured timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Io(err) => {
                matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
            }
            _ => false,
        }
    }

    /// True when the connection can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionClosed { .. }
                | TransportError::Closed
                | TransportError::InvalidFrameSize(_)
                | TransportError::FrameTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// A command that could not be delivered, with the underlying cause if known.
///
/// Not produced by [`crate::Connection`] itself; higher layers use it to hand
/// failed sends back to application code.
#[derive(Debug, thiserror::Error)]
#[error("send failed: {command}")]
pub struct SendError {
    pub command: Command,
    #[source]
    pub error: Option<TransportError>,
}

impl SendError {
    pub fn new(command: Command, error: Option<TransportError>) -> Self {
        Self { command, error }
    }
}

impl From<(Command, TransportError)> for SendError {
    fn from((command, error): (Command, TransportError)) -> Self {
        Self::new(command, Some(error))
    }
}
