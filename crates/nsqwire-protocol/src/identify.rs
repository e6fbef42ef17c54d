use serde::{Deserialize, Serialize};

/// Commonly negotiated `IDENTIFY` keys.
///
/// Unset fields are left out of the JSON body so the daemon applies its own
/// defaults. Any other `Serialize` value (a map, `serde_json::Value`) can be
/// passed to [`crate::identify`] when more keys are needed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdentifyOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Ask the daemon to reply with its own settings as a JSON response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_negotiation: Option<bool>,
    /// Milliseconds between heartbeats; `-1` disables them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_buffer_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_buffer_timeout: Option<i64>,
    /// Server-side message timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_timeout: Option<i64>,
    /// Percentage (0-99) of messages to deliver to this client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u8>,
}
