//! linkstash document storage service.
//!
//! Accepts multi-file documents over HTTP, writes them transactionally to an
//! object store and hands a notification to the indexing worker.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use service::Config;

/// linkstash document storage service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for the API server (overrides listen_addr's port)
    #[arg(long)]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Directory for a daily rolling log file
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(port) = self.port {
            config.listen_addr.set_port(port);
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
            config.tracing_level()?;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = Some(log_dir);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    service::spawn_service(&config).await
}
