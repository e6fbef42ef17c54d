use bytes::{Buf, Bytes};

use crate::error::{ProtocolError, Result};
use crate::message::{decode_message, Message};

pub const FRAME_TYPE_RESPONSE: i32 = 0;
pub const FRAME_TYPE_ERROR: i32 = 1;
pub const FRAME_TYPE_MESSAGE: i32 = 2;

const FRAME_TYPE_SIZE: usize = 4;

/// Response payload acknowledging a command.
pub const OK: &[u8] = b"OK";
/// Response payload the daemon sends periodically; answer with `NOP`.
pub const HEARTBEAT: &[u8] = b"_heartbeat_";
/// Response payload acknowledging a graceful close.
pub const CLOSE_WAIT: &[u8] = b"CLOSE_WAIT";

/// Frame type code carried in the first four bytes of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Response,
    Error,
    Message,
}

impl FrameType {
    pub const fn code(self) -> i32 {
        match self {
            FrameType::Response => FRAME_TYPE_RESPONSE,
            FrameType::Error => FRAME_TYPE_ERROR,
            FrameType::Message => FRAME_TYPE_MESSAGE,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            FRAME_TYPE_RESPONSE => Ok(FrameType::Response),
            FRAME_TYPE_ERROR => Ok(FrameType::Error),
            FRAME_TYPE_MESSAGE => Ok(FrameType::Message),
            other => Err(ProtocolError::UnknownFrameType(other)),
        }
    }
}

impl TryFrom<i32> for FrameType {
    type Error = ProtocolError;

    fn try_from(code: i32) -> Result<Self> {
        Self::from_code(code)
    }
}

/// Split a frame into its raw type code and the remaining payload.
///
/// The payload length is not checked against anything; the outer size prefix
/// already bounded the frame.
pub fn unpack_response(data: &[u8]) -> Result<(i32, &[u8])> {
    if data.len() < FRAME_TYPE_SIZE {
        return Err(ProtocolError::Truncated {
            what: "frame",
            got: data.len(),
            needed: FRAME_TYPE_SIZE,
        });
    }
    let (head, rest) = data.split_at(FRAME_TYPE_SIZE);
    let code = i32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    Ok((code, rest))
}

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Status text such as `OK` or `_heartbeat_`.
    Response(Bytes),
    /// Error code text such as `E_INVALID`.
    Error(Bytes),
    Message(Message),
}

impl Frame {
    /// Decode one complete frame (without its size prefix).
    pub fn decode(data: impl Into<Bytes>) -> Result<Self> {
        let mut data = data.into();
        let (code, _) = unpack_response(&data)?;
        let frame_type = FrameType::from_code(code)?;
        data.advance(FRAME_TYPE_SIZE);

        Ok(match frame_type {
            FrameType::Response => Frame::Response(data),
            FrameType::Error => Frame::Error(data),
            FrameType::Message => Frame::Message(decode_message(data)?),
        })
    }

    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Response(_) => FrameType::Response,
            Frame::Error(_) => FrameType::Error,
            Frame::Message(_) => FrameType::Message,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Frame::Response(data) if data.as_ref() == OK)
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Frame::Response(data) if data.as_ref() == HEARTBEAT)
    }

    /// The error code text of an error frame.
    pub fn error_code(&self) -> Option<String> {
        match self {
            Frame::Error(data) => Some(String::from_utf8_lossy(data).into_owned()),
            _ => None,
        }
    }

    pub fn into_message(self) -> Option<Message> {
        match self {
            Frame::Message(message) => Some(message),
            _ => None,
        }
    }
}
