//! Message encoding and decoding
//!
//! Decoding happens in two steps so the two failure classes stay distinct:
//! the payload is first parsed as generic JSON (failure is
//! [`DecodeError::MalformedPayload`]), then the discriminating fields are
//! checked and the value is mapped onto [`Message`] (failure is
//! [`DecodeError::UnknownShape`]).

use serde_json::Value;
use thiserror::Error;

use super::Message;
use crate::error::Result;

/// Reasons an inbound payload is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload is not well-formed JSON.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The payload is JSON but lacks the fields that identify a message shape.
    #[error("unknown message shape: {0}")]
    UnknownShape(String),
}

/// Serialize a message to its wire text.
///
/// Output is deterministic: fields are emitted in declaration order and
/// object params are emitted with sorted keys.
///
/// # Errors
///
/// Returns [`crate::error::DocrelayError::Serialization`] if serialization
/// fails.
///
/// # Examples
///
/// ```
/// use docrelay::protocol::{encode, Message};
///
/// let text = encode(&Message::response(3, serde_json::json!({"ok": true}))).unwrap();
/// assert_eq!(text, r#"{"type":"response","id":3,"result":{"ok":true}}"#);
/// ```
pub fn encode(message: &Message) -> Result<String> {
    serde_json::to_string(message)
        .map_err(|e| crate::error::DocrelayError::Serialization(e).into())
}

/// Parse wire text into a message.
///
/// # Errors
///
/// - [`DecodeError::MalformedPayload`] when `raw` is not valid JSON.
/// - [`DecodeError::UnknownShape`] when `raw` is not an object, lacks `type`,
///   lacks the id/method field its `type` requires, or names an unknown type.
///
/// # Examples
///
/// ```
/// use docrelay::protocol::{decode, DecodeError, Message};
///
/// let msg = decode(r#"{"id":1,"type":"request","method":"listTools","params":{}}"#).unwrap();
/// assert_eq!(msg, Message::request(1, "listTools", serde_json::json!({})));
///
/// assert!(matches!(decode("{"), Err(DecodeError::MalformedPayload(_))));
/// assert!(matches!(decode(r#"{"id":1}"#), Err(DecodeError::UnknownShape(_))));
/// ```
pub fn decode(raw: &str) -> std::result::Result<Message, DecodeError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| DecodeError::UnknownShape("message is not an object".to_string()))?;

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::UnknownShape("missing `type` field".to_string()))?;

    let required: &[&str] = match kind {
        "request" => &["id", "method"],
        "response" => &["id"],
        "error" => &["error"],
        "notification" => &["method"],
        other => {
            return Err(DecodeError::UnknownShape(format!(
                "unknown message type `{other}`"
            )))
        }
    };

    if let Some(missing) = required.iter().find(|field| !object.contains_key(**field)) {
        return Err(DecodeError::UnknownShape(format!(
            "`{kind}` message missing `{missing}` field"
        )));
    }

    serde_json::from_value(value).map_err(|e| DecodeError::UnknownShape(e.to_string()))
}
