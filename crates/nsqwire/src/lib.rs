//! Client-side wire protocol for NSQ.
//!
//! nsqwire builds protocol commands, decodes response, error and message
//! frames, and moves them over a single blocking TCP connection.
//!
//! # Crate Structure
//!
//! - [`protocol`]: Pure codec: commands, frames, messages, name validation
//! - [`transport`]: Blocking connection with one-frame-per-call reads
//!
//! ```no_run
//! use nsqwire::protocol::publish;
//! use nsqwire::transport::Connection;
//!
//! let mut conn = Connection::connect("127.0.0.1", 4150)?;
//! conn.send_command(&publish("events", "hello")?)?;
//! assert!(conn.read_frame()?.is_ok());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Re-export codec types.
pub mod protocol {
    pub use nsqwire_protocol::*;
}

/// Re-export transport types.
pub mod transport {
    pub use nsqwire_transport::*;
}
