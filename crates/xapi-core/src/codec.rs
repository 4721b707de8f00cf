//! Request/response envelope encoding and decoding.
//!
//! The wire protocol is JSON text over a persistent socket. A request is
//! `{"command": <name>}` with an optional `"arguments"` object; a response is
//! `{"status": bool}` with optional `returnData`, `errorCode`, `errorDescr`,
//! and (for `login`) a top-level `streamSessionId`.
//!
//! Zero-argument commands omit the `arguments` field entirely. That is a wire
//! compatibility requirement: an empty-but-present arguments object is a
//! different message from no arguments at all.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, XapiError};

/// Outbound command envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Command name, e.g. `"getTrades"`.
    pub command: String,

    /// Flattened argument object. `None` omits the field from the frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl Request {
    /// A command with no arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            arguments: None,
        }
    }

    /// A command with an arguments object.
    ///
    /// An explicitly empty object is normalized to "no arguments" so the
    /// field stays off the wire.
    pub fn with_arguments(command: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) if map.is_empty() => None,
            Value::Null => None,
            other => Some(other),
        };
        Self {
            command: command.into(),
            arguments,
        }
    }

    /// Serialize to a single JSON text frame.
    pub fn to_frame(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| XapiError::Protocol(e.to_string()))
    }
}

/// Inbound response envelope.
///
/// `status == false` implies `error_code`/`error_descr` are present;
/// `status == true` implies `return_data` is present only for commands that
/// return a payload (`logout` and `ping` return none).
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub status: bool,

    #[serde(rename = "returnData")]
    pub return_data: Option<Value>,

    #[serde(rename = "errorCode")]
    pub error_code: Option<String>,

    #[serde(rename = "errorDescr")]
    pub error_descr: Option<String>,

    /// Sent as a sibling of `status` on a successful `login`.
    #[serde(rename = "streamSessionId")]
    pub stream_session_id: Option<String>,
}

impl Response {
    /// Convert a rejected response into the corresponding error.
    ///
    /// Returns `Ok(())` for `status == true`.
    pub fn check(&self) -> Result<()> {
        if self.status {
            return Ok(());
        }
        Err(XapiError::CommandFailed {
            code: self.error_code.clone().unwrap_or_default(),
            description: self.error_descr.clone().unwrap_or_default(),
        })
    }
}

/// Parse a raw text frame into a [`Response`].
///
/// Fails with [`XapiError::Protocol`] if the frame is not well-formed JSON or
/// is missing the `status` field.
pub fn decode(raw: &str) -> Result<Response> {
    serde_json::from_str(raw).map_err(|e| {
        warn!("undecodable response frame: {e}");
        XapiError::Protocol(e.to_string())
    })
}
