//! Blocking transport for the NSQ TCP protocol.
//!
//! A [`Connection`] owns one stream and an internal byte accumulator. It
//! writes the protocol magic on construction, then hands out exactly one
//! complete frame per [`Connection::read_response`] call, in arrival order.
//! No partial frames, no buffer management in user code.

pub mod config;
pub mod conn;
pub mod error;

pub use config::{ConnConfig, DEFAULT_MAX_FRAME_SIZE, DEFAULT_READ_CHUNK_SIZE, DEFAULT_TIMEOUT};
pub use conn::{ConnState, Connection, SIZE_PREFIX_LEN};
pub use error::{Result, SendError, TransportError};
