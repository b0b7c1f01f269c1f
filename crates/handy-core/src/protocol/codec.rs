//! JSON codec for the handy order protocol.
//!
//! Wire format: one UTF-8 encoded JSON object per transport read.
//!
//! There is no length prefix and no delimiter.  The server reads at most
//! [`MAX_MESSAGE_SIZE`] bytes and treats whatever arrived as exactly one
//! message.  A message split across two reads, or two messages arriving in one
//! read, fail to decode and the connection is closed.

use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::{ClientMessage, OrderMessage, ServerResponse};

/// Upper bound on a single request or response, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 4096;

const ORDER_TYPE: &str = "order";
const INQUIRY_TYPE: &str = "inquiry";

/// Errors that can occur while decoding a request or encoding a response.
///
/// Any decode error closes the connection without a reply.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The bytes are not valid UTF-8.
    #[error("message is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The text is not valid JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// The JSON value is valid but not an object (e.g. an array or a number).
    #[error("message is not a JSON object")]
    NotAnObject,

    /// An `order` message whose fields have the wrong JSON types, such as a
    /// numeric table id or an item that is not a `[name, count]` pair.
    #[error("malformed order: {0}")]
    MalformedOrder(String),

    /// The response could not be serialized.
    #[error("failed to encode response: {0}")]
    Encode(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one inbound message from the bytes of a single read.
///
/// Dispatch is on the `type` field.  `order` is decoded into an
/// [`OrderMessage`] (still unvalidated), `inquiry` carries no payload, and any
/// other or missing `type` yields [`ClientMessage::Unknown`], which is not an
/// error.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are not UTF-8, not a JSON object, or
/// an `order` with wrongly-typed fields.
///
/// # Examples
///
/// ```rust
/// use handy_core::{decode_message, ClientMessage};
///
/// let msg = decode_message(br#"{"type":"inquiry"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::Inquiry);
/// ```
pub fn decode_message(bytes: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let text = std::str::from_utf8(bytes)?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    let kind = fields.get("type").and_then(Value::as_str).map(str::to_string);
    match kind.as_deref() {
        Some(ORDER_TYPE) => serde_json::from_value::<OrderMessage>(Value::Object(fields))
            .map(ClientMessage::Order)
            .map_err(|e| ProtocolError::MalformedOrder(e.to_string())),
        Some(INQUIRY_TYPE) => Ok(ClientMessage::Inquiry),
        _ => Ok(ClientMessage::Unknown(kind)),
    }
}

/// Encodes a response as compact UTF-8 JSON.
///
/// Non-ASCII item names are written as raw UTF-8, not `\u` escapes.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use handy_core::{encode_response, ServerResponse};
///
/// let bytes = encode_response(&ServerResponse::accepted()).unwrap();
/// assert!(bytes.starts_with(br#"{"status":"success""#));
/// ```
pub fn encode_response(response: &ServerResponse) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(response).map_err(|e| ProtocolError::Encode(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
