// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: resolved paths, timeouts, and the codec in use.

use std::sync::Arc;
use std::time::Duration;

use singleton_core::{Codec, JsonCodec, RuntimeDir, SingletonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Core(#[from] SingletonError),
}

/// Resolved daemon configuration for one logical name.
pub struct Config {
    pub service_name: String,
    pub runtime_dir: RuntimeDir,
    pub idle_ttl: Option<Duration>,
    pub max_frame_size: usize,
    pub codec: Arc<dyn Codec>,
}

impl Config {
    /// Load configuration for `service_name`, honoring the same environment
    /// variables the connect-or-spawn coordinator reads so a daemon and the
    /// client that spawned it always agree on where to rendezvous.
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let runtime_dir = RuntimeDir::resolve(service_name)?;
        Ok(Self {
            service_name: service_name.to_string(),
            runtime_dir,
            idle_ttl: idle_ttl(),
            max_frame_size: singleton_core::DEFAULT_MAX_FRAME_SIZE,
            codec: Arc::new(JsonCodec),
        })
    }
}

/// Idle-TTL before an unused daemon shuts itself down. `None` (set via
/// `SINGLETON_IDLE_TTL_MS=0`) means "never shut down on idle".
fn idle_ttl() -> Option<Duration> {
    match std::env::var("SINGLETON_IDLE_TTL_MS").ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(0) => None,
        Some(ms) => Some(Duration::from_millis(ms)),
        None => Some(Duration::from_secs(300)),
    }
}
