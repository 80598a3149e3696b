// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-facing error type: the session error taxonomy plus the handful
//! of failures specific to spawning a daemon.

use singleton_core::SingletonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Core(#[from] SingletonError),

    #[error("no daemon is running for this name")]
    DaemonNotRunning,

    #[error("failed to start the daemon: {0}")]
    DaemonStartFailed(String),

    #[error("timed out waiting for the daemon to finish starting")]
    DaemonStartTimeout,
}
