// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connect-or-spawn coordination: find a live daemon for a logical name,
//! or start one and wait for it to come up.
//!
//! There is no lock held on the client side. Mutual exclusion between
//! daemon generations is entirely the daemon's own [`singleton_core::RuntimeLock`],
//! held for its whole lifetime; a client that loses the spawn race simply
//! watches its own child exit with [`singleton_core::exit_codes::ALREADY_RUNNING`]
//! and keeps polling metadata for whichever generation won.

use std::sync::Arc;
use std::time::{Duration, Instant};

use singleton_core::{env, exit_codes, AuthToken, JsonCodec, MetadataRead, RuntimeDir, RuntimeMetadata};
use tracing::{debug, info, warn};

use crate::daemon_process::spawn_daemon_background;
use crate::error::ClientError;
use crate::session::Session;

/// Upper bound on the spawn-wait poll interval, once `connect_poll_floor`
/// has doubled its way up.
const POLL_CAP: Duration = Duration::from_millis(100);

/// Connect to an existing daemon for `service_name`. Fails with
/// [`ClientError::DaemonNotRunning`] if none is reachable; never spawns one.
pub async fn connect(service_name: &str) -> Result<Session, ClientError> {
    let runtime_dir = RuntimeDir::resolve(service_name)?;
    let metadata = match runtime_dir.read_metadata() {
        MetadataRead::Valid(m) => m,
        MetadataRead::Missing => return Err(ClientError::DaemonNotRunning),
    };
    try_connect(&runtime_dir, &metadata, env::timeout_connect())
        .await
        .ok_or(ClientError::DaemonNotRunning)
}

/// Connect to a daemon for `service_name`, spawning one if none is
/// currently reachable. Bounded by `SINGLETON_TIMEOUT_START_MS` overall.
pub async fn connect_or_spawn(service_name: &str) -> Result<Session, ClientError> {
    let runtime_dir = RuntimeDir::resolve(service_name)?;
    let connect_timeout = env::timeout_connect();

    if let MetadataRead::Valid(metadata) = runtime_dir.read_metadata() {
        if let Some(session) = try_connect(&runtime_dir, &metadata, connect_timeout).await {
            return Ok(session);
        }
        debug!(service_name, "existing metadata is stale, clearing it");
        if let Err(e) = runtime_dir.clear() {
            warn!(error = %e, "failed to clear stale runtime metadata");
        }
    }

    let mut child = spawn_daemon_background(service_name)?;
    let start_timeout = env::timeout_start();
    let mut poll_interval = env::connect_poll_floor();
    let start = Instant::now();

    loop {
        if start.elapsed() >= start_timeout {
            return Err(ClientError::DaemonStartTimeout);
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                if status.code() != Some(exit_codes::ALREADY_RUNNING) {
                    return Err(ClientError::DaemonStartFailed(format!(
                        "daemon exited with {status}"
                    )));
                }
                // A sibling generation already won the race; keep polling
                // for its metadata instead of treating this as a failure.
            }
            Ok(None) => {}
            Err(_) => {}
        }

        if let MetadataRead::Valid(metadata) = runtime_dir.read_metadata() {
            if let Some(session) = try_connect(&runtime_dir, &metadata, connect_timeout).await {
                info!(service_name, pid = metadata.pid, "connected to daemon");
                return Ok(session);
            }
        }

        tokio::time::sleep(poll_interval.min(start_timeout.saturating_sub(start.elapsed()))).await;
        poll_interval = (poll_interval * 2).min(POLL_CAP);
    }
}

/// Attempt one connect+handshake against the daemon described by
/// `metadata`. Any failure (refused connection, stale auth token, protocol
/// mismatch) is folded into `None` — the caller's job is to decide what
/// "not reachable right now" means, not to distinguish the reason.
async fn try_connect(
    runtime_dir: &RuntimeDir,
    metadata: &RuntimeMetadata,
    timeout: Duration,
) -> Option<Session> {
    let token = AuthToken::read_from(&runtime_dir.auth_path).ok()?;
    let codec = Arc::new(JsonCodec);
    Session::open(&metadata.host, metadata.port, &token, codec, singleton_core::DEFAULT_MAX_FRAME_SIZE, timeout)
        .await
        .ok()
}
