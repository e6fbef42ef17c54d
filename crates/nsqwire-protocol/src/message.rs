use std::fmt;

use bytes::{Buf, Bytes};

use crate::error::{ProtocolError, Result};

/// Length of a message id in bytes.
pub const MESSAGE_ID_LEN: usize = 16;

/// Fixed-size prefix of a message payload: timestamp (8) + attempts (2) + id (16).
pub const MESSAGE_HEADER_LEN: usize = 8 + 2 + MESSAGE_ID_LEN;

/// Opaque 16-byte message identifier assigned by the daemon.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId([u8; MESSAGE_ID_LEN]);

impl MessageId {
    pub const fn new(bytes: [u8; MESSAGE_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MESSAGE_ID_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for MessageId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// A message delivered inside a message frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    body: Bytes,
    timestamp: i64,
    attempts: u16,
}

impl Message {
    pub fn new(id: MessageId, body: impl Into<Bytes>, timestamp: i64, attempts: u16) -> Self {
        Self {
            id,
            body: body.into(),
            timestamp,
            attempts,
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Producer-assigned timestamp, in nanoseconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// How many times the daemon has attempted delivery.
    pub fn attempts(&self) -> u16 {
        self.attempts
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Decode a message frame payload.
///
/// Payload layout:
/// ```text
/// ┌────────────────┬──────────────┬────────────┬──────────────────┐
/// │ Timestamp      │ Attempts     │ Id         │ Body             │
/// │ (8B BE i64)    │ (2B BE u16)  │ (16B)      │ (remaining bytes)│
/// └────────────────┴──────────────┴────────────┴──────────────────┘
/// ```
pub fn decode_message(data: impl Into<Bytes>) -> Result<Message> {
    let mut data = data.into();
    if data.len() < MESSAGE_HEADER_LEN {
        return Err(ProtocolError::Truncated {
            what: "message",
            got: data.len(),
            needed: MESSAGE_HEADER_LEN,
        });
    }

    let timestamp = data.get_i64();
    let attempts = data.get_u16();
    let mut id = [0u8; MESSAGE_ID_LEN];
    data.copy_to_slice(&mut id);

    Ok(Message {
        id: MessageId(id),
        body: data,
        timestamp,
        attempts,
    })
}
