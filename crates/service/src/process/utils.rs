use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const REQUEST_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Watches handed out by [`graceful_shutdown_blocker`].
pub struct ShutdownSignals {
    /// Resolves once shutdown has been signalled.
    pub waiter: JoinHandle<()>,
    /// Sender for programmatic shutdown.
    pub shutdown_tx: watch::Sender<()>,
    /// Fires when tasks should stop.
    pub shutdown_rx: watch::Receiver<()>,
    /// Fires as soon as a signal arrives, before any grace period.
    pub draining_rx: watch::Receiver<()>,
}

/// Spawns a task that listens for SIGINT and SIGTERM and sends a shutdown signal via a watch.
///
/// On SIGTERM the draining watch fires right away while the shutdown watch
/// waits out the request grace period.
pub fn graceful_shutdown_blocker() -> std::io::Result<ShutdownSignals> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let (draining_tx, draining_rx) = watch::channel(());
    let signal_tx = shutdown_tx.clone();

    let waiter = tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::debug!("gracefully exiting immediately on SIGINT");
                let _ = draining_tx.send(());
            }
            _ = sigterm.recv() => {
                tracing::debug!("initiating graceful shutdown with delay on SIGTERM");
                let _ = draining_tx.send(());
                tokio::time::sleep(REQUEST_GRACE_PERIOD).await;
            }
        }

        let _ = signal_tx.send(());
    });

    Ok(ShutdownSignals {
        waiter,
        shutdown_tx,
        shutdown_rx,
        draining_rx,
    })
}

/// Registers a panic hook that logs panics using the `tracing` crate
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| match panic.location() {
        Some(loc) => {
            tracing::error!(
                message = %panic,
                panic.file = loc.file(),
                panic.line = loc.line(),
                panic.column = loc.column(),
            );
        }
        None => tracing::error!(message = %panic),
    }));
}

pub fn report_build_info() {
    let build = common::prelude::build_info();

    tracing::info!(
        build_profile = ?build.build_profile,
        version = ?build.version,
        "service starting up"
    );
}
