// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolving and spawning the `singletond` binary.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::error::ClientError;

/// Start `singletond` in the background for `service_name`, inheriting the
/// current process's environment (so a caller's `SINGLETON_RUNTIME_DIR` /
/// `SINGLETON_IDLE_TTL_MS` overrides reach the child unchanged).
pub fn spawn_daemon_background(service_name: &str) -> Result<Child, ClientError> {
    let binary = find_daemon_binary();

    Command::new(&binary)
        .arg(service_name)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {e}", binary.display())))
}

/// Resolve the path to the `singletond` binary: an explicit override, a
/// sibling of the current executable, a debug-build sibling in the
/// workspace's `target/debug`, or finally a bare name resolved via `PATH`.
fn find_daemon_binary() -> PathBuf {
    if let Ok(path) = std::env::var("SINGLETON_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    let current_exe = std::env::current_exe().ok();

    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .map(|s| s.contains("target/debug"))
        .unwrap_or(false);

    if is_debug_build {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let dev_path = PathBuf::from(manifest_dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target/debug/singletond"));
            if let Some(path) = dev_path {
                if path.exists() {
                    return path;
                }
            }
        }
    }

    if let Some(exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("singletond");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("singletond")
}
