pub mod utils;

use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const LOG_FILE_PREFIX: &str = "linkstash.log";

use crate::http;
use crate::indexer::{self, IndexerStats};
use crate::{Config, ServiceState};

/// Initialize logging, panic handler, and build info reporting.
/// Returns guards that must be kept alive for the duration of the program.
fn init_logging(
    config: &Config,
    log_level: tracing::Level,
) -> Vec<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let mut guards = Vec::new();

    // Stdout layer
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(stdout_guard);

    let stdout_env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(stdout_env_filter);

    // File layer (if log_dir is set)
    if let Some(log_dir) = &config.log_dir {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!(
                "Warning: Failed to create log directory {:?}: {}",
                log_dir, e
            );
        }

        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        guards.push(file_guard);

        let file_env_filter = EnvFilter::builder()
            .with_default_directive(log_level.into())
            .from_env_lossy();

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(file_env_filter);

        tracing_subscriber::registry()
            .with(stdout_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry().with(stdout_layer).init();
    }

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

/// Runs the service: API server + indexing worker.
/// Blocks until a shutdown signal is received and every task has stopped.
pub async fn spawn_service(config: &Config) -> anyhow::Result<()> {
    let log_level = config.tracing_level()?;
    let _guards = init_logging(config, log_level);

    let utils::ShutdownSignals {
        waiter: graceful_waiter,
        shutdown_tx: _shutdown_tx,
        shutdown_rx,
        draining_rx,
    } = utils::graceful_shutdown_blocker()?;

    let (state, receiver) = match ServiceState::from_config(config, draining_rx).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("error creating server state: {}", e);
            std::process::exit(3);
        }
    };

    let mut handles = Vec::new();

    // Spawn indexing worker, if events stay in process
    if let Some(receiver) = receiver {
        let worker_rx = shutdown_rx.clone();
        let worker_handle = tokio::spawn(indexer::run_worker(
            receiver,
            IndexerStats::default(),
            worker_rx,
        ));
        handles.push(worker_handle);
    }

    // Spawn API server
    let api_config = http::Config::new(config.listen_addr, log_level);
    let api_rx = shutdown_rx.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = http::run_api(api_config, state, api_rx).await {
            tracing::error!("API server error: {}", e);
        }
    });
    handles.push(api_handle);

    tracing::info!(
        addr = %config.listen_addr,
        documents_folder = %config.documents_folder,
        "Running: API server + indexing worker"
    );

    let _ = graceful_waiter.await;

    if timeout(FINAL_SHUTDOWN_TIMEOUT, join_all(handles))
        .await
        .is_err()
    {
        tracing::error!(
            "Failed to shut down within {} seconds",
            FINAL_SHUTDOWN_TIMEOUT.as_secs()
        );
        std::process::exit(4);
    }

    Ok(())
}
