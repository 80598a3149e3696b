// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! singletond: hosts one object behind a loopback port and answers calls to
//! it in arrival order until told to shut down or left idle past its TTL.
//!
//! The object hosted here is a placeholder counter ([`demo::Counter`]); a
//! real deployment links this daemon against its own [`singleton_core::ObjectFactory`]
//! instead.

mod demo;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use singleton_daemon::{lifecycle, listener, Config, DaemonError, StartupResult};

/// Hosts a singleton object and answers calls to it over a loopback socket.
#[derive(Parser, Debug)]
#[command(name = "singletond")]
struct Args {
    /// Logical name selecting this daemon's runtime directory. Clients use
    /// the same name to find or spawn it.
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = Config::load(&args.name)?;
    let _log_guard = setup_logging(&config);
    let idle_ttl = config.idle_ttl;

    info!(service_name = %config.service_name, "starting daemon");

    let factory = demo::CounterFactory;
    let mut startup_result = match lifecycle::startup(config, &factory).await {
        Ok(result) => result,
        Err(DaemonError::AlreadyRunning) => {
            eprintln!("singletond: a daemon is already running for this name");
            std::process::exit(singleton_core::exit_codes::ALREADY_RUNNING);
        }
        Err(DaemonError::Bind(e)) => {
            eprintln!("singletond: failed to bind a loopback port: {e}");
            std::process::exit(singleton_core::exit_codes::BIND_FAILED);
        }
        Err(DaemonError::Factory(e)) => {
            eprintln!("singletond: failed to construct the hosted object: {e}");
            std::process::exit(singleton_core::exit_codes::FACTORY_FAILED);
        }
        Err(e) => {
            eprintln!("singletond: failed to start: {e}");
            std::process::exit(singleton_core::exit_codes::STARTUP_FAILED);
        }
    };

    println!("READY");

    let shared = startup_result.shared.clone();
    if let Some(idle_ttl) = idle_ttl {
        tokio::spawn(lifecycle::run_idle_watchdog(shared.clone(), idle_ttl));
    }

    // `startup` always populates the listener and this is the only call
    // site that ever takes it, so this is always `Some`.
    #[allow(clippy::expect_used)]
    let tcp_listener = startup_result
        .take_listener()
        .expect("listener already taken");
    let accept_task = tokio::spawn(listener::run(tcp_listener, shared.clone()));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = shared.shutdown.notified() => {
            info!("shutting down: signaled over a session or idle watchdog");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
            shared.shutdown.notify_waiters();
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
            shared.shutdown.notify_waiters();
        }
    }

    let _ = accept_task.await;
    startup_result.shutdown().await;
    info!("daemon stopped");
    Ok(())
}

fn setup_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = &config.runtime_dir.dir;
    if std::fs::create_dir_all(log_dir).is_err() {
        return None;
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .try_init();

    match result {
        Ok(()) => Some(guard),
        Err(e) => {
            error!("logging already initialized: {e}");
            None
        }
    }
}
