/// Errors raised while building commands or decoding server data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A topic or channel name failed the name rule.
    #[error("invalid {kind} name {name:?}")]
    InvalidName { kind: &'static str, name: String },

    /// A command parameter failed its precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A command body could not be serialized.
    #[error("body encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Fewer bytes were supplied than the structure requires.
    #[error("truncated {what} ({got} bytes, need at least {needed})")]
    Truncated {
        what: &'static str,
        got: usize,
        needed: usize,
    },

    /// The frame type code is not one of response, error or message.
    #[error("unknown frame type {0}")]
    UnknownFrameType(i32),

    /// A body does not fit the signed 32-bit length prefix.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Payload consistency violation. Not raised by the codec itself.
    #[error("integrity check failed: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
