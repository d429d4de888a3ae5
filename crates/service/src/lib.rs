/**
 * Bearer-token middleware for the document routes.
 */
pub mod auth;
/**
 * Service configuration, read from a TOML file.
 */
pub mod config;
/**
 * Delivery of document stored events.
 */
pub mod event_bus;
/**
 * HTTP server and handlers.
 */
pub mod http;
/**
 * Stub consumer of document stored events.
 */
pub mod indexer;
/**
 * Process lifecycle: logging, signals, task supervision.
 */
pub mod process;
/**
 * Bearer secret sources.
 */
pub mod secrets;
mod state;

pub use config::Config;
pub use process::spawn_service;
pub use state::{State as ServiceState, StateSetupError};
