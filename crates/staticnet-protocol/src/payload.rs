//! Outgoing payload kinds and the inbound decode chain.
//!
//! Publishers hand in bytes, text or a JSON value. Receivers get the raw
//! bytes plus whatever richer views can be recovered from them: UTF-8
//! text, a JSON value parsed from that text, and a pointer record. Each
//! stage is an `Option`-returning transform; a failed stage leaves its
//! view empty and never aborts delivery.

use serde::Serialize;
use serde_json::Value;
use staticnet_types::{Result, StaticNetError};

use crate::pointer::StaticPointer;

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// Payload handed to `publish`.
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    /// Opaque bytes, sent as-is.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// JSON value, sent as its text serialization.
    Json(Value),
}

impl EventPayload {
    /// Builds a JSON payload from any serializable value.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| StaticNetError::ProtocolError {
                reason: format!("payload is not representable as JSON: {e}"),
            })
    }

    /// Returns the bytes that go on the wire.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => text.into_bytes(),
            Self::Json(value) => value.to_string().into_bytes(),
        }
    }
}

impl From<Vec<u8>> for EventPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for EventPayload {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for EventPayload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for EventPayload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for EventPayload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

// ---------------------------------------------------------------------------
// Decode chain
// ---------------------------------------------------------------------------

/// Every view recovered from a delivered payload.
#[derive(Clone, Debug, Default)]
pub struct DecodedPayload {
    /// Raw bytes.
    pub data: Vec<u8>,
    /// Bytes as UTF-8, if valid.
    pub text: Option<String>,
    /// Text parsed as JSON, if valid.
    pub json: Option<Value>,
    /// Bytes parsed as a correctly signed pointer record, if they are one.
    pub pointer: Option<StaticPointer>,
}

/// Interprets bytes as UTF-8 text.
pub fn decode_text(data: &[u8]) -> Option<String> {
    std::str::from_utf8(data).ok().map(str::to_string)
}

/// Parses text as a JSON value.
pub fn decode_json(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Parses bytes as a pointer record whose signature verifies against its
/// owner. Expiry is not checked; the record may be stale.
pub fn decode_pointer(data: &[u8]) -> Option<StaticPointer> {
    StaticPointer::decode(data).ok().filter(|pointer| pointer.verify().is_ok())
}

/// Runs the full chain: bytes, text, JSON, pointer.
pub fn decode_payload(data: Vec<u8>) -> DecodedPayload {
    let text = decode_text(&data);
    let json = text.as_deref().and_then(decode_json);
    let pointer = match text {
        Some(_) => None,
        None => decode_pointer(&data),
    };

    DecodedPayload {
        data,
        text,
        json,
        pointer,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
