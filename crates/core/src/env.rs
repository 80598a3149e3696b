// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the core crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::SingletonError;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Resolve the base runtime directory: SINGLETON_RUNTIME_DIR >
/// XDG_STATE_HOME/singleton > ~/.local/state/singleton
pub fn runtime_base_dir() -> Result<PathBuf, SingletonError> {
    if let Ok(dir) = std::env::var("SINGLETON_RUNTIME_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("singleton"));
    }
    let home = std::env::var("HOME").map_err(|_| SingletonError::NoRuntimeDir)?;
    Ok(PathBuf::from(home).join(".local/state/singleton"))
}

/// Timeout for a single connect+handshake attempt.
pub fn timeout_connect() -> Duration {
    parse_duration_ms("SINGLETON_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout bounding the entire connect-or-spawn cycle.
pub fn timeout_start() -> Duration {
    parse_duration_ms("SINGLETON_TIMEOUT_START_MS").unwrap_or(Duration::from_secs(5))
}

/// Per-request IPC read/write timeout.
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("SINGLETON_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Polling backoff floor for the coordinator's spawn-wait loop (capped at 100ms).
pub fn connect_poll_floor() -> Duration {
    parse_duration_ms("SINGLETON_CONNECT_POLL_MS").unwrap_or(Duration::from_millis(10))
}
