use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use common::prelude::ObjectStoreConfig;

use crate::event_bus::EventsConfig;
use crate::secrets::SecretSource;

/// Service configuration, loaded once at startup from a TOML file.
///
/// Every field has a default so an empty file (or no file) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// address for the API server to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// object-store prefix every document folder lives under
    #[serde(default = "default_documents_folder")]
    pub documents_folder: String,
    /// name stamped on every emitted event
    #[serde(default = "default_event_bus_name")]
    pub event_bus_name: String,

    // misc
    /// default log level; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// write a daily rolling log file here in addition to stdout
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub auth: SecretSource,
    #[serde(default)]
    pub events: EventsConfig,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 3000)
}

fn default_documents_folder() -> String {
    "document-storage".to_string()
}

fn default_event_bus_name() -> String {
    "linkstash".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            documents_folder: default_documents_folder(),
            event_bus_name: default_event_bus_name(),
            log_level: default_log_level(),
            log_dir: None,
            object_store: ObjectStoreConfig::default(),
            auth: SecretSource::default(),
            events: EventsConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.tracing_level()?;
        if config.documents_folder.trim_matches('/').is_empty() {
            return Err(ConfigError::InvalidDocumentsFolder);
        }
        if let EventsConfig::Queue { max_queue_size: 0 } = config.events {
            return Err(ConfigError::InvalidQueueSize);
        }
        Ok(config)
    }

    pub fn tracing_level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("documents_folder must not be empty")]
    InvalidDocumentsFolder,
    #[error("events.max_queue_size must be at least 1")]
    InvalidQueueSize,
}
