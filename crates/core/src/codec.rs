// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload codec boundary.
//!
//! The core treats the codec as an external collaborator: it knows only
//! the encode/decode contract, never the payload's meaning. `Value` is
//! `serde_json::Value`, the generic argument/result representation that
//! crosses the wire.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("serialization error: {0}")]
pub struct SerializationError(pub String);

/// The codec contract a session (C4) invokes without interpreting
/// payloads.
pub trait Codec: Send + Sync {
    /// Stable identifier negotiated into `RuntimeMetadata::codec_id` and
    /// echoed in `PONG`.
    fn id(&self) -> &str;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, SerializationError>;
    fn decode(&self, bytes: &[u8]) -> Result<Value, SerializationError>;

    /// Shape a remote-error descriptor the same way a value is encoded, so
    /// `REMOTE_ERROR` payloads travel through the same codec as results.
    fn encode_error(&self, descriptor: &ErrorDescriptor) -> Result<Vec<u8>, SerializationError> {
        let value = serde_json::to_value(descriptor)
            .map_err(|e| SerializationError(e.to_string()))?;
        self.encode(&value)
    }

    fn decode_error(&self, bytes: &[u8]) -> Result<ErrorDescriptor, SerializationError> {
        let value = self.decode(bytes)?;
        serde_json::from_value(value).map_err(|e| SerializationError(e.to_string()))
    }
}

/// A method-call failure shaped for the wire, independent of the codec.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorDescriptor {
    pub kind_tag: String,
    pub message: String,
    pub traceback_text: String,
}

/// The default codec: plain JSON over the "4-byte length prefix + JSON
/// payload" wire format.
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn id(&self) -> &str {
        "json-v1"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(value).map_err(|e| SerializationError(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, SerializationError> {
        serde_json::from_slice(bytes).map_err(|e| SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_codec_round_trips_a_value() {
        let codec = JsonCodec;
        let value = json!({"a": 1, "b": [1, 2, 3]});
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn json_codec_rejects_garbage_on_decode() {
        let codec = JsonCodec;
        assert!(codec.decode(b"not json").is_err());
    }

    #[test]
    fn error_descriptor_round_trips_through_codec() {
        let codec = JsonCodec;
        let descriptor = ErrorDescriptor {
            kind_tag: "ValueError".to_string(),
            message: "nope".to_string(),
            traceback_text: "line 1".to_string(),
        };
        let bytes = codec.encode_error(&descriptor).unwrap();
        let decoded = codec.decode_error(&bytes).unwrap();
        assert_eq!(decoded.kind_tag, descriptor.kind_tag);
        assert_eq!(decoded.message, descriptor.message);
    }
}
