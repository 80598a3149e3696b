// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy surfaced to coordinator/session callers.

use thiserror::Error;

/// Root error kind grouping every failure mode a client can observe.
#[derive(Debug, Error)]
pub enum SingletonError {
    #[error("could not determine runtime directory")]
    NoRuntimeDir,

    #[error("failed to reach a daemon: {0}")]
    ConnectionFailed(String),

    #[error("handshake rejected: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("remote method raised {kind_tag}: {message}")]
    Remote {
        kind_tag: String,
        message: String,
        traceback_text: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("request aborted by daemon shutdown")]
    ServerShuttingDown,

    #[error("session dropped while a reply was pending")]
    ServerCrashed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sub-kinds of a rejected handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("protocol version mismatch: client={client}, daemon={daemon}")]
    ProtocolMismatch { client: u32, daemon: u32 },

    #[error("auth token rejected")]
    AuthRejected,
}
