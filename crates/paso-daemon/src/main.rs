//! pasod — the background daemon that owns the SQLite store and relays
//! change events to connected clients over a Unix-domain socket.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use paso_core::logging;
use paso_core::shutdown::ShutdownSignal;
use paso_core::store::Store;
use paso_ipc::event_bus::EventBus;
use paso_ipc::metrics::Metrics;
use paso_ipc::Daemon;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("pasod").context("failed to initialize logging")?;
    info!(pid = std::process::id(), "pasod starting");

    let db_path = logging::db_path();
    let socket_path = logging::socket_path();

    let store = Store::open(&db_path).await.context("failed to open store")?;
    let _store = Arc::new(store);

    let metrics = Arc::new(Metrics::default());
    let bus = Arc::new(EventBus::new(metrics.clone()));
    let daemon = Daemon::new(bus, metrics);

    let shutdown = ShutdownSignal::new();
    spawn_signal_handlers(shutdown.clone());

    info!(socket = %socket_path.display(), db = %db_path.display(), "pasod ready");
    daemon.run(&socket_path, shutdown).await?;

    info!("pasod stopped");
    Ok(())
}

/// Installs SIGINT/SIGTERM/SIGQUIT handlers, each triggering the same
/// shutdown signal the daemon's accept loop and background tasks select on.
fn spawn_signal_handlers(shutdown: ShutdownSignal) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        tokio::spawn(async move {
            let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
            let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
            let mut sigquit = signal(SignalKind::quit()).expect("install SIGQUIT handler");

            tokio::select! {
                _ = sigint.recv() => info!("received SIGINT"),
                _ = sigterm.recv() => info!("received SIGTERM"),
                _ = sigquit.recv() => info!("received SIGQUIT"),
            }
            shutdown.trigger();
        });
    }
    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.trigger();
        });
    }
}
