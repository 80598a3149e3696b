// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session message envelope: a closed, tagged variant rather than a
//! string-keyed mapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The wire-protocol version this crate speaks. A bump here is an
/// incompatible change.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum Message {
    Hello {
        protocol_version: u32,
        /// Raw token bytes, base64-free on the wire since the JSON codec
        /// round-trips bytes as a JSON array; kept as `Vec<u8>` so other
        /// codecs can serialize the way they see fit.
        token: Vec<u8>,
        codec_id: String,
    },
    HelloOk {
        pid: u32,
        started_at_unix_ms: u64,
        server_info: String,
    },
    HelloErr {
        reason: HelloErrReason,
    },
    Call {
        method_name: String,
        args: Value,
        kwargs: Value,
    },
    Result {
        value: Value,
    },
    RemoteError {
        kind_tag: String,
        message: String,
        traceback_text: String,
    },
    Ping,
    Pong {
        pid: u32,
        uptime_secs: u64,
        active_clients: usize,
        codec_id: String,
        protocol_version: u32,
    },
    Close,
    Shutdown {
        #[serde(default)]
        force: bool,
    },
}

/// Distinguishing reason carried by `HelloErr`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum HelloErrReason {
    ProtocolMismatch { daemon_version: u32 },
    AuthRejected,
}

/// Convenience constructor for a `Call` message with no keyword arguments.
pub fn call(method_name: impl Into<String>, args: Value) -> Message {
    Message::Call {
        method_name: method_name.into(),
        args,
        kwargs: Value::Object(serde_json::Map::new()),
    }
}

/// Convenience constructor for a `Call` message with keyword arguments.
pub fn call_with_kwargs(
    method_name: impl Into<String>,
    args: Value,
    kwargs: HashMap<String, Value>,
) -> Message {
    Message::Call {
        method_name: method_name.into(),
        args,
        kwargs: serde_json::to_value(kwargs).unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_round_trips_through_json() {
        let msg = Message::Hello {
            protocol_version: PROTOCOL_VERSION,
            token: vec![1, 2, 3, 4],
            codec_id: "json-v1".to_string(),
        };
        let json = serde_json::to_vec(&msg).unwrap();
        let decoded: Message = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn call_and_result_round_trip() {
        let msg = call("inc", serde_json::json!([]));
        let json = serde_json::to_vec(&msg).unwrap();
        let decoded: Message = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, msg);

        let result = Message::Result {
            value: serde_json::json!(42),
        };
        let json = serde_json::to_vec(&result).unwrap();
        let decoded: Message = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn hello_err_reasons_round_trip() {
        for reason in [
            HelloErrReason::ProtocolMismatch { daemon_version: 2 },
            HelloErrReason::AuthRejected,
        ] {
            let msg = Message::HelloErr { reason };
            let json = serde_json::to_vec(&msg).unwrap();
            let decoded: Message = serde_json::from_slice(&json).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn distinct_kinds_are_tagged_distinctly() {
        let ping = serde_json::to_value(Message::Ping).unwrap();
        let close = serde_json::to_value(Message::Close).unwrap();
        assert_ne!(ping["kind"], close["kind"]);
    }
}
