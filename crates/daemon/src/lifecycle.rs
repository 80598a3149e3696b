// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, idle-TTL shutdown, and teardown.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use singleton_core::{DispatchError, ObjectFactory, RuntimeLock, RuntimeMetadata, SingletonError};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};
use tracing::{info, warn};

use crate::config::Config;
use crate::executor::{ExecutorHandle, SequentialExecutor};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("another daemon is already running for this name")]
    AlreadyRunning,

    #[error("failed to bind a loopback port: {0}")]
    Bind(#[source] io::Error),

    #[error("object factory failed: {0}")]
    Factory(#[from] DispatchError),

    #[error("failed to publish runtime metadata: {0}")]
    MetadataPublish(#[source] io::Error),

    #[error(transparent)]
    Core(#[from] SingletonError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Connection-count and shutdown signaling shared by every task in the
/// daemon. Cheap to clone (an `Arc` wrapper); the only mutable state is the
/// atomic connection counter and the two notifications.
#[derive(Clone)]
pub struct Shared {
    connections: Arc<AtomicUsize>,
    connections_tx: watch::Sender<usize>,
    connections_rx: watch::Receiver<usize>,
    pub shutdown: Arc<Notify>,
    pub executor: ExecutorHandle,
    pub token: Arc<singleton_core::AuthToken>,
    pub codec: Arc<dyn singleton_core::Codec>,
    pub max_frame_size: usize,
    pub pid: u32,
    pub start_time: Instant,
    pub started_at_unix_ms: u64,
}

impl Shared {
    pub fn connection_opened(&self) {
        let n = self.connections.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.connections_tx.send(n);
    }

    pub fn connection_closed(&self) {
        let n = self.connections.fetch_sub(1, Ordering::SeqCst) - 1;
        let _ = self.connections_tx.send(n);
    }

    pub fn active_connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Result of a successful startup: everything `main` needs to run the
/// accept loop and the idle-TTL watchdog.
pub struct StartupResult {
    listener: Option<TcpListener>,
    pub shared: Shared,
    // Held for the daemon's entire lifetime: dropping it releases the
    // exclusive lock, which is how a peer detects this generation is gone.
    #[allow(dead_code)]
    lock: RuntimeLock,
    executor: SequentialExecutor,
    config: Config,
}

impl StartupResult {
    /// Borrow the bound listener, e.g. to read its local address. `None`
    /// only once [`Self::take_listener`] has already been called.
    pub fn listener(&self) -> Option<&TcpListener> {
        self.listener.as_ref()
    }

    /// Take ownership of the bound listener to hand it to the accept loop.
    /// `None` if called more than once; `startup` always populates this
    /// field, so the first call on a freshly returned `StartupResult`
    /// always succeeds.
    pub fn take_listener(&mut self) -> Option<TcpListener> {
        self.listener.take()
    }

    /// Unlink the metadata record and auth token, drain the executor, and
    /// release the runtime lock (via drop). Call exactly once, after the
    /// accept loop and idle watchdog have both stopped.
    pub async fn shutdown(self) {
        info!("shutting down");
        if let Err(e) = self.config.runtime_dir.clear() {
            warn!(error = %e, "failed to clear runtime metadata on shutdown");
        }
        self.executor.shutdown().await;
        info!("shutdown complete");
    }
}

/// Start the daemon: acquire the exclusive lock, bind a loopback port,
/// build the singleton, and publish runtime metadata. On any failure after
/// the lock is held, metadata/auth files are cleaned up before returning.
pub async fn startup(config: Config, factory: &dyn ObjectFactory) -> Result<StartupResult, DaemonError> {
    config.runtime_dir.ensure_exists()?;

    let lock = RuntimeLock::try_acquire(&config.runtime_dir.lock_path)?
        .ok_or(DaemonError::AlreadyRunning)?;

    match startup_inner(&config, &lock, factory).await {
        Ok((listener, shared, executor)) => Ok(StartupResult {
            listener: Some(listener),
            shared,
            lock,
            executor,
            config,
        }),
        Err(e) => {
            if let Err(clear_err) = config.runtime_dir.clear() {
                warn!(error = %clear_err, "failed to clean up after failed startup");
            }
            Err(e)
        }
    }
}

async fn startup_inner(
    config: &Config,
    _lock: &RuntimeLock,
    factory: &dyn ObjectFactory,
) -> Result<(TcpListener, Shared, SequentialExecutor), DaemonError> {
    let executor = SequentialExecutor::spawn(factory)?;

    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(DaemonError::Bind)?;
    let port = listener.local_addr().map_err(DaemonError::Bind)?.port();

    let token = singleton_core::AuthToken::generate();
    token
        .write_to(&config.runtime_dir.auth_path)
        .map_err(DaemonError::MetadataPublish)?;

    let metadata = RuntimeMetadata::new(
        singleton_core::PROTOCOL_VERSION,
        port,
        &config.service_name,
        config.codec.id(),
    );
    config
        .runtime_dir
        .publish_metadata(&metadata)
        .map_err(DaemonError::MetadataPublish)?;

    let (connections_tx, connections_rx) = watch::channel(0usize);
    let shared = Shared {
        connections: Arc::new(AtomicUsize::new(0)),
        connections_tx,
        connections_rx,
        shutdown: Arc::new(Notify::new()),
        executor: executor.handle(),
        token: Arc::new(token),
        codec: Arc::clone(&config.codec),
        max_frame_size: config.max_frame_size,
        pid: std::process::id(),
        start_time: Instant::now(),
        started_at_unix_ms: metadata.started_at_unix_ms,
    };

    info!(port, service_name = %config.service_name, "daemon listening");
    Ok((listener, shared, executor))
}

/// Watch the connection count; once it has been zero for `idle_ttl`,
/// notify `shutdown`. Cancels and restarts the countdown every time the
/// count leaves zero and returns to it again. Runs until `shutdown` fires
/// from elsewhere, at which point it exits without notifying a second time.
pub async fn run_idle_watchdog(shared: Shared, idle_ttl: Duration) {
    let mut rx = shared.connections_rx.clone();
    loop {
        if *rx.borrow() != 0 {
            if rx.changed().await.is_err() {
                return;
            }
            continue;
        }

        tokio::select! {
            _ = tokio::time::sleep(idle_ttl) => {
                if *rx.borrow() == 0 {
                    info!(?idle_ttl, "idle timeout elapsed, shutting down");
                    shared.shutdown.notify_waiters();
                    return;
                }
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = shared.shutdown.notified() => {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use singleton_core::{Dispatch, FnFactory};
    use tempfile::tempdir;

    struct Noop;
    impl Dispatch for Noop {
        fn call(
            &mut self,
            _method: &str,
            _args: serde_json::Value,
            _kwargs: serde_json::Value,
        ) -> Result<serde_json::Value, DispatchError> {
            Ok(serde_json::Value::Null)
        }
    }

    fn noop_factory() -> FnFactory<impl Fn() -> Result<Box<dyn Dispatch>, DispatchError>> {
        FnFactory(|| Ok(Box::new(Noop) as Box<dyn Dispatch>))
    }

    #[tokio::test]
    #[serial]
    async fn startup_publishes_metadata_and_binds_a_port() {
        let dir = tempdir().unwrap();
        std::env::set_var("SINGLETON_RUNTIME_DIR", dir.path());
        let config = Config::load("test-service").unwrap();
        let factory = noop_factory();

        let result = startup(config, &factory).await.unwrap();
        assert!(result.listener().unwrap().local_addr().unwrap().port() > 0);
        assert!(matches!(
            singleton_core::RuntimeDir::resolve("test-service")
                .unwrap()
                .read_metadata(),
            singleton_core::MetadataRead::Valid(_)
        ));

        result.shutdown().await;
        std::env::remove_var("SINGLETON_RUNTIME_DIR");
    }

    #[tokio::test]
    #[serial]
    async fn second_startup_for_the_same_name_fails_while_first_is_live() {
        let dir = tempdir().unwrap();
        std::env::set_var("SINGLETON_RUNTIME_DIR", dir.path());
        let factory = noop_factory();

        let first = startup(Config::load("svc").unwrap(), &factory).await.unwrap();
        let second = startup(Config::load("svc").unwrap(), &factory).await;
        assert!(matches!(second, Err(DaemonError::AlreadyRunning)));

        first.shutdown().await;
        std::env::remove_var("SINGLETON_RUNTIME_DIR");
    }

    #[tokio::test]
    #[serial]
    async fn idle_watchdog_fires_after_ttl_with_no_connections() {
        let dir = tempdir().unwrap();
        std::env::set_var("SINGLETON_RUNTIME_DIR", dir.path());
        let factory = noop_factory();
        let result = startup(Config::load("svc-idle").unwrap(), &factory).await.unwrap();
        let shared = result.shared.clone();

        let watchdog = tokio::spawn(run_idle_watchdog(shared.clone(), Duration::from_millis(30)));
        shared.shutdown.notified().await;
        watchdog.await.unwrap();

        result.shutdown().await;
        std::env::remove_var("SINGLETON_RUNTIME_DIR");
    }
}
