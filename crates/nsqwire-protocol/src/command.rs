use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::error::{ProtocolError, Result};
use crate::name::{valid_channel_name, valid_topic_name};

/// Protocol magic written once, right after the connection is established.
pub const MAGIC_V2: &[u8; 4] = b"  V2";

const NEWLINE: u8 = b'\n';
const SPACE: u8 = b' ';
const BODY_PREFIX_SIZE: usize = 4;

/// Largest body the signed 32-bit length prefix can describe.
const MAX_BODY_LEN: usize = i32::MAX as usize;

/// Command keyword naming a client-to-server operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Auth,
    Fin,
    Identify,
    Mpub,
    Nop,
    Pub,
    Rdy,
    Req,
    Sub,
    Touch,
}

impl Verb {
    /// The ASCII token sent on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Verb::Auth => "AUTH",
            Verb::Fin => "FIN",
            Verb::Identify => "IDENTIFY",
            Verb::Mpub => "MPUB",
            Verb::Nop => "NOP",
            Verb::Pub => "PUB",
            Verb::Rdy => "RDY",
            Verb::Req => "REQ",
            Verb::Sub => "SUB",
            Verb::Touch => "TOUCH",
        }
    }

    pub const fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command body: raw bytes, or text that is UTF-8 encoded on assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Bytes(Bytes),
    Text(String),
}

impl Body {
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Bytes(bytes) => bytes.as_ref(),
            Body::Text(text) => text.as_bytes(),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Body::Bytes(bytes) => bytes,
            Body::Text(text) => Bytes::from(text.into_bytes()),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Body {
    fn from(bytes: &[u8]) -> Self {
        Body::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<&[u8; N]> for Body {
    fn from(bytes: &[u8; N]) -> Self {
        Body::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_owned())
    }
}

/// A fully assembled protocol command.
///
/// Wire format:
/// ```text
/// VERB[ param1 param2 ...]\n[<body length (4B BE)><body>]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: Verb,
    params: Vec<Bytes>,
    body: Option<Bytes>,
}

impl Command {
    /// Create a command with no parameters and no body.
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            params: Vec::new(),
            body: None,
        }
    }

    /// Append a space-separated parameter.
    pub fn param(mut self, param: impl AsRef<[u8]>) -> Self {
        self.params.push(Bytes::copy_from_slice(param.as_ref()));
        self
    }

    /// Attach a length-prefixed body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Result<Self> {
        let body = body.into().into_bytes();
        if body.len() > MAX_BODY_LEN {
            return Err(ProtocolError::PayloadTooLarge {
                size: body.len(),
                max: MAX_BODY_LEN,
            });
        }
        self.body = Some(body);
        Ok(self)
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn params(&self) -> &[Bytes] {
        &self.params
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Number of bytes [`Command::encode`] will write.
    pub fn encoded_len(&self) -> usize {
        let params: usize = self.params.iter().map(|p| 1 + p.len()).sum();
        let body = self
            .body
            .as_ref()
            .map_or(0, |body| BODY_PREFIX_SIZE + body.len());
        self.verb.as_bytes().len() + params + 1 + body
    }

    /// Append the wire encoding of this command to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_slice(self.verb.as_bytes());
        for param in &self.params {
            dst.put_u8(SPACE);
            dst.put_slice(param);
        }
        dst.put_u8(NEWLINE);
        if let Some(body) = &self.body {
            // Length was bounded by with_body.
            dst.put_i32(body.len() as i32);
            dst.put_slice(body);
        }
    }

    /// The wire encoding of this command as one contiguous buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut dst);
        dst.freeze()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb.as_str())?;
        for param in &self.params {
            write!(f, " {}", String::from_utf8_lossy(param))?;
        }
        if let Some(body) = &self.body {
            write!(f, " ({} byte body)", body.len())?;
        }
        Ok(())
    }
}

/// `IDENTIFY` with `data` serialized as the JSON body.
pub fn identify<T: Serialize + ?Sized>(data: &T) -> Result<Command> {
    let json = serde_json::to_vec(data)?;
    Command::new(Verb::Identify).with_body(json)
}

/// `AUTH` with an opaque secret body.
pub fn auth(secret: impl Into<Body>) -> Result<Command> {
    Command::new(Verb::Auth).with_body(secret)
}

/// `SUB topic channel`. Both names must pass the name rule.
pub fn subscribe(topic: &str, channel: &str) -> Result<Command> {
    if !valid_topic_name(topic) {
        return Err(ProtocolError::InvalidName {
            kind: "topic",
            name: topic.to_owned(),
        });
    }
    if !valid_channel_name(channel) {
        return Err(ProtocolError::InvalidName {
            kind: "channel",
            name: channel.to_owned(),
        });
    }
    Ok(Command::new(Verb::Sub).param(topic).param(channel))
}

/// `RDY count`. Negative counts are rejected.
pub fn ready(count: i64) -> Result<Command> {
    if count < 0 {
        return Err(ProtocolError::InvalidArgument(format!(
            "ready count cannot be negative (got {count})"
        )));
    }
    Ok(Command::new(Verb::Rdy).param(count.to_string()))
}

/// `FIN id`. The id is passed through untouched.
pub fn finish(id: impl AsRef<[u8]>) -> Command {
    Command::new(Verb::Fin).param(id)
}

/// `REQ id delay_ms`.
pub fn requeue(id: impl AsRef<[u8]>, delay_ms: i64) -> Command {
    Command::new(Verb::Req)
        .param(id)
        .param(delay_ms.to_string())
}

/// `REQ id 0`.
pub fn requeue_now(id: impl AsRef<[u8]>) -> Command {
    requeue(id, 0)
}

/// `TOUCH id`.
pub fn touch(id: impl AsRef<[u8]>) -> Command {
    Command::new(Verb::Touch).param(id)
}

/// `NOP`, used to answer heartbeats.
pub fn nop() -> Command {
    Command::new(Verb::Nop)
}

/// `PUB topic` with `body` as the message.
///
/// The topic is not run through the name rule; the daemon validates it.
pub fn publish(topic: &str, body: impl Into<Body>) -> Result<Command> {
    Command::new(Verb::Pub).param(topic).with_body(body)
}

/// `MPUB topic` carrying every body in order.
///
/// Body layout:
/// ```text
/// <count (4B BE)> { <length (4B BE)> <message> }*
/// ```
pub fn multi_publish<I, B>(topic: &str, bodies: I) -> Result<Command>
where
    I: IntoIterator<Item = B>,
    B: Into<Body>,
{
    let bodies: Vec<Body> = bodies.into_iter().map(Into::into).collect();
    let count = i32::try_from(bodies.len()).map_err(|_| {
        ProtocolError::InvalidArgument(format!("too many messages ({})", bodies.len()))
    })?;

    let total: usize = bodies.iter().map(|b| BODY_PREFIX_SIZE + b.len()).sum();
    let mut composed = BytesMut::with_capacity(BODY_PREFIX_SIZE + total);
    composed.put_i32(count);
    for (index, body) in bodies.iter().enumerate() {
        let len = i32::try_from(body.len()).map_err(|_| {
            ProtocolError::InvalidArgument(format!(
                "message {index} too large ({} bytes)",
                body.len()
            ))
        })?;
        composed.put_i32(len);
        composed.put_slice(body.as_bytes());
    }

    Command::new(Verb::Mpub)
        .param(topic)
        .with_body(composed.freeze())
}
