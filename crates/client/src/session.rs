// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An established, handshaken connection to one daemon generation.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use singleton_core::{
    read_frame, write_frame, AuthToken, Codec, HandshakeError, HelloErrReason, Message,
    SingletonError, PROTOCOL_VERSION,
};
use tokio::net::TcpStream;

/// Snapshot of daemon state returned by [`Session::ping`].
#[derive(Debug, Clone)]
pub struct PongInfo {
    pub pid: u32,
    pub uptime_secs: u64,
    pub active_clients: usize,
    pub codec_id: String,
    pub protocol_version: u32,
}

/// One live connection to a daemon. Calls on a `Session` are not
/// pipelined: each `call`/`ping` sends a request and awaits its matching
/// reply before returning, same as the daemon's one-request-at-a-time read
/// loop expects.
pub struct Session {
    stream: TcpStream,
    codec: Arc<dyn Codec>,
    max_frame_size: usize,
}

impl Session {
    /// Connect to `host:port` and perform the HELLO handshake. Returns a
    /// [`HandshakeError`]-wrapped failure for a rejected HELLO, distinct
    /// from a bare connection failure, so callers can tell "wrong daemon
    /// generation" apart from "nothing is listening".
    pub(crate) async fn open(
        host: &str,
        port: u16,
        token: &AuthToken,
        codec: Arc<dyn Codec>,
        max_frame_size: usize,
        connect_timeout: Duration,
    ) -> Result<Self, SingletonError> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| SingletonError::ConnectionFailed("connect timed out".to_string()))?
            .map_err(|e| SingletonError::ConnectionFailed(e.to_string()))?;

        let mut session = Self {
            stream,
            codec,
            max_frame_size,
        };
        session.handshake(token, connect_timeout).await?;
        Ok(session)
    }

    async fn handshake(&mut self, token: &AuthToken, timeout: Duration) -> Result<(), SingletonError> {
        let hello = Message::Hello {
            protocol_version: PROTOCOL_VERSION,
            token: token.as_bytes().to_vec(),
            codec_id: self.codec.id().to_string(),
        };
        self.send(&hello).await?;

        let reply = tokio::time::timeout(timeout, self.recv())
            .await
            .map_err(|_| SingletonError::ConnectionFailed("handshake timed out".to_string()))??;

        match reply {
            Message::HelloOk { .. } => Ok(()),
            Message::HelloErr {
                reason: HelloErrReason::ProtocolMismatch { daemon_version },
            } => Err(HandshakeError::ProtocolMismatch {
                client: PROTOCOL_VERSION,
                daemon: daemon_version,
            }
            .into()),
            Message::HelloErr {
                reason: HelloErrReason::AuthRejected,
            } => Err(HandshakeError::AuthRejected.into()),
            other => Err(SingletonError::ConnectionFailed(format!(
                "unexpected reply to HELLO: {other:?}"
            ))),
        }
    }

    /// Invoke a method on the hosted object and await its result.
    pub async fn call(
        &mut self,
        method_name: impl Into<String>,
        args: Value,
        kwargs: Value,
        timeout: Duration,
    ) -> Result<Value, SingletonError> {
        let request = Message::Call {
            method_name: method_name.into(),
            args,
            kwargs,
        };
        self.send(&request).await?;
        match self.recv_within(timeout).await? {
            Message::Result { value } => Ok(value),
            Message::RemoteError {
                kind_tag,
                message,
                traceback_text,
            } => Err(SingletonError::Remote {
                kind_tag,
                message,
                traceback_text,
            }),
            other => Err(SingletonError::ConnectionFailed(format!(
                "unexpected reply to CALL: {other:?}"
            ))),
        }
    }

    /// Liveness/introspection probe that does not touch the hosted object.
    pub async fn ping(&mut self, timeout: Duration) -> Result<PongInfo, SingletonError> {
        self.send(&Message::Ping).await?;
        match self.recv_within(timeout).await? {
            Message::Pong {
                pid,
                uptime_secs,
                active_clients,
                codec_id,
                protocol_version,
            } => Ok(PongInfo {
                pid,
                uptime_secs,
                active_clients,
                codec_id,
                protocol_version,
            }),
            other => Err(SingletonError::ConnectionFailed(format!(
                "unexpected reply to PING: {other:?}"
            ))),
        }
    }

    /// Close this session without affecting the daemon or other sessions.
    pub async fn close(mut self) -> Result<(), SingletonError> {
        self.send(&Message::Close).await
    }

    /// Ask the daemon to shut down entirely, tearing down every session.
    pub async fn shutdown_daemon(&mut self, force: bool) -> Result<(), SingletonError> {
        self.send(&Message::Shutdown { force }).await
    }

    /// Await the reply to a request already sent. A transport failure here
    /// means the daemon went away mid-call, distinct from a connection that
    /// was never reachable in the first place.
    async fn recv_within(&mut self, timeout: Duration) -> Result<Message, SingletonError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(SingletonError::ServerCrashed),
            Err(_) => Err(SingletonError::ConnectionFailed("request timed out".to_string())),
        }
    }

    async fn send(&mut self, message: &Message) -> Result<(), SingletonError> {
        let value = serde_json::to_value(message)
            .map_err(|e| SingletonError::Serialization(e.to_string()))?;
        let bytes = self
            .codec
            .encode(&value)
            .map_err(|e| SingletonError::Serialization(e.to_string()))?;
        write_frame(&mut self.stream, &bytes, self.max_frame_size)
            .await
            .map_err(|e| SingletonError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Message, SingletonError> {
        let frame = read_frame(&mut self.stream, self.max_frame_size)
            .await
            .map_err(|e| SingletonError::ConnectionFailed(e.to_string()))?;
        let value = self
            .codec
            .decode(&frame)
            .map_err(|e| SingletonError::Serialization(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| SingletonError::Serialization(e.to_string()))
    }
}
