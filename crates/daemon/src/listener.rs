// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accept loop and per-connection session handling.
//!
//! Each connection gets its own spawned task: a HELLO handshake, then a
//! request loop that forwards CALL to the sequential executor and answers
//! PING synchronously without touching it.

use std::sync::Arc;

use singleton_core::{
    read_frame, write_frame, AuthToken, DispatchError, HelloErrReason, Message, TransportError,
    PROTOCOL_VERSION,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::lifecycle::Shared;

#[derive(Debug, Error)]
enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("handshake rejected: {0:?}")]
    HandshakeRejected(HelloErrReason),

    #[error("client sent a message before completing the handshake")]
    NoHandshake,
}

/// Run the accept loop until `shared.shutdown` fires. Each accepted
/// connection is handled on its own task so one slow or hostile client
/// cannot block others.
pub async fn run(listener: TcpListener, shared: Shared) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        debug!(%addr, "accepted connection");
                        let shared = shared.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &shared).await {
                                match e {
                                    SessionError::Transport(TransportError::ConnectionClosed) => {
                                        debug!("client disconnected");
                                    }
                                    e => warn!(error = %e, "connection ended with an error"),
                                }
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
            _ = shared.shutdown.notified() => {
                info!("accept loop stopping");
                return;
            }
        }
    }
}

async fn handle_connection<S>(mut stream: S, shared: &Shared) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if !handshake(&mut stream, shared).await? {
        return Ok(());
    }

    // Counted only from here: a rejected or abandoned handshake never
    // touches the connection count the idle watchdog and PONG read.
    shared.connection_opened();
    let result = request_loop(&mut stream, shared).await;
    shared.connection_closed();
    result
}

async fn request_loop<S>(stream: &mut S, shared: &Shared) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = match read_frame(stream, shared.max_frame_size).await {
            Ok(frame) => frame,
            Err(TransportError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let message: Message = match shared.codec.decode(&frame) {
            Ok(value) => serde_json::from_value(value).map_err(|e| {
                TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?,
            Err(e) => {
                warn!(error = %e, "failed to decode a frame, closing connection");
                return Ok(());
            }
        };

        match message {
            Message::Call {
                method_name,
                args,
                kwargs,
            } => {
                let reply = match shared.executor.call(method_name, args, kwargs).await {
                    Ok(value) => Message::Result { value },
                    Err(DispatchError {
                        kind_tag,
                        message,
                        traceback_text,
                    }) => Message::RemoteError {
                        kind_tag,
                        message,
                        traceback_text,
                    },
                };
                send(stream, shared, &reply).await?;
            }
            Message::Ping => {
                let pong = Message::Pong {
                    pid: shared.pid,
                    uptime_secs: shared.start_time.elapsed().as_secs(),
                    active_clients: shared.active_connections(),
                    codec_id: shared.codec.id().to_string(),
                    protocol_version: PROTOCOL_VERSION,
                };
                send(stream, shared, &pong).await?;
            }
            Message::Close => return Ok(()),
            Message::Shutdown { .. } => {
                info!("shutdown requested over a session");
                shared.shutdown.notify_waiters();
                return Ok(());
            }
            other => {
                warn!(?other, "unexpected message in the request loop, closing connection");
                return Ok(());
            }
        }
    }
}

/// Perform the HELLO/HELLO_OK/HELLO_ERR exchange. Returns `Ok(true)` if the
/// session should continue into the request loop, `Ok(false)` if it was
/// rejected and the connection is already closed.
async fn handshake<S>(stream: &mut S, shared: &Shared) -> Result<bool, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = read_frame(stream, shared.max_frame_size).await?;
    let value = shared
        .codec
        .decode(&frame)
        .map_err(|_| SessionError::NoHandshake)?;
    let message: Message = serde_json::from_value(value).map_err(|_| SessionError::NoHandshake)?;

    let Message::Hello {
        protocol_version,
        token,
        codec_id: _,
    } = message
    else {
        return Err(SessionError::NoHandshake);
    };

    if protocol_version != PROTOCOL_VERSION {
        let reason = HelloErrReason::ProtocolMismatch {
            daemon_version: PROTOCOL_VERSION,
        };
        send(
            stream,
            shared,
            &Message::HelloErr {
                reason: reason.clone(),
            },
        )
        .await?;
        return Err(SessionError::HandshakeRejected(reason));
    }

    if !AuthToken::from_bytes(token).matches(&shared.token) {
        send(
            stream,
            shared,
            &Message::HelloErr {
                reason: HelloErrReason::AuthRejected,
            },
        )
        .await?;
        return Err(SessionError::HandshakeRejected(HelloErrReason::AuthRejected));
    }

    send(
        stream,
        shared,
        &Message::HelloOk {
            pid: shared.pid,
            started_at_unix_ms: shared.started_at_unix_ms,
            server_info: format!("singletond/{PROTOCOL_VERSION}"),
        },
    )
    .await?;
    Ok(true)
}

async fn send<S>(stream: &mut S, shared: &Shared, message: &Message) -> Result<(), SessionError>
where
    S: AsyncWrite + Unpin,
{
    let value = serde_json::to_value(message).map_err(|e| {
        TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    let bytes = shared.codec.encode(&value).map_err(|e| {
        TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    write_frame(stream, &bytes, shared.max_frame_size).await?;
    Ok(())
}
