//! Channel wire format.

use crate::error::ChannelError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One message on the wire: `{"type": ..., "data": ..., "timestamp": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    /// RFC 3339 send time, millisecond precision, UTC
    #[serde(default)]
    pub timestamp: String,
}

impl ChannelMessage {
    /// Stamps a new message with the current time.
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn encode(&self) -> Result<String, ChannelError> {
        serde_json::to_string(self).map_err(|e| ChannelError::Encode(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, ChannelError> {
        Ok(serde_json::from_str(text)?)
    }
}
