//! Client-side codec for the NSQ TCP protocol.
//!
//! Everything here is pure: builders turn intents into [`Command`] values,
//! decoders turn raw frame bytes back into [`Frame`]s and [`Message`]s. No I/O
//! happens in this crate; see `nsqwire-transport` for the blocking connection.
//!
//! Server frames on the wire look like:
//! - A 4-byte big-endian frame size `N`
//! - A 4-byte big-endian frame type (response, error, message)
//! - `N - 4` bytes of payload

pub mod command;
pub mod error;
pub mod frame;
pub mod identify;
pub mod message;
pub mod name;

pub use command::{
    auth, finish, identify, multi_publish, nop, publish, ready, requeue, requeue_now, subscribe,
    touch, Body, Command, Verb, MAGIC_V2,
};
pub use error::{ProtocolError, Result};
pub use frame::{
    unpack_response, Frame, FrameType, CLOSE_WAIT, FRAME_TYPE_ERROR, FRAME_TYPE_MESSAGE,
    FRAME_TYPE_RESPONSE, HEARTBEAT, OK,
};
pub use identify::IdentifyOptions;
pub use message::{decode_message, Message, MessageId, MESSAGE_HEADER_LEN, MESSAGE_ID_LEN};
pub use name::{valid_channel_name, valid_topic_name, EPHEMERAL_SUFFIX, MAX_NAME_LEN};
