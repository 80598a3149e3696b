// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame transport: length-prefixed frames over a loopback byte stream.
//!
//! Each frame is a 4-byte big-endian length prefix followed by exactly
//! that many payload bytes. The transport is oblivious to payload content.

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Default maximum frame length (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timeout")]
    Timeout,
}

/// Read one length-prefixed frame. EOF before the length prefix is a clean
/// close; EOF mid-frame is a transport error.
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    max_frame_size: usize,
) -> Result<Vec<u8>, TransportError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::ConnectionClosed);
        }
        Err(e) => return Err(TransportError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame_size {
        return Err(TransportError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        });
    }

    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => TransportError::ConnectionClosed,
            _ => TransportError::Io(e),
        })?;
    Ok(buf)
}

/// Write one length-prefixed frame. Short writes are looped to completion
/// by `write_all`.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    payload: &[u8],
    max_frame_size: usize,
) -> Result<(), TransportError> {
    if payload.len() > max_frame_size {
        return Err(TransportError::FrameTooLarge {
            size: payload.len(),
            max: max_frame_size,
        });
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn round_trips_a_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello", DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();

        let mut cursor = Cursor::new(buf);
        let frame = read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).await.unwrap();
        assert_eq!(frame, b"hello");
    }

    #[tokio::test]
    async fn empty_frame_round_trips() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"", DEFAULT_MAX_FRAME_SIZE).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let frame = read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).await.unwrap();
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_on_write() {
        let mut buf = Vec::new();
        let result = write_frame(&mut buf, &vec![0u8; 10], 4).await;
        assert!(matches!(result, Err(TransportError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected_on_read() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(100u32).to_be_bytes());
        let mut cursor = Cursor::new(buf);
        let result = read_frame(&mut cursor, 4).await;
        assert!(matches!(result, Err(TransportError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn eof_before_length_prefix_is_connection_closed() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let result = read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn eof_mid_frame_is_an_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(10u32).to_be_bytes());
        buf.extend_from_slice(b"ab");
        let mut cursor = Cursor::new(buf);
        let result = read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).await;
        assert!(result.is_err());
        assert!(!matches!(result, Err(TransportError::FrameTooLarge { .. })));
    }
}
