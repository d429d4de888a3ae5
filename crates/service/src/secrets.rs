//! Bearer secret lookup.
//!
//! The secret is fetched once while the service state is built and kept for
//! the life of the process. Rotating it requires a restart.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Environment variable read by the default secret source.
pub const DEFAULT_TOKEN_VAR: &str = "LINKSTASH_BEARER_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("environment variable {0} is not set")]
    MissingVar(String),
    #[error("failed to read secret file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("the configured bearer token is empty")]
    Empty,
}

/// Shared secret that incoming requests must present.
#[derive(Clone)]
pub struct BearerToken(Arc<str>);

impl BearerToken {
    /// Surrounding whitespace (a trailing newline in a secret file) is
    /// not part of the token.
    pub fn new(token: impl AsRef<str>) -> Result<Self, SecretError> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return Err(SecretError::Empty);
        }
        Ok(Self(Arc::from(token)))
    }

    /// Constant-time comparison against a presented credential.
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Source of the bearer secret.
#[async_trait]
pub trait SecretProvider: Send + Sync + fmt::Debug {
    async fn bearer_token(&self) -> Result<BearerToken, SecretError>;
}

/// Where the bearer secret comes from, as written in the config file.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretSource {
    /// Read from an environment variable
    Env {
        #[serde(default = "default_token_var")]
        var: String,
    },
    /// Read from a file (e.g. a mounted secret)
    File { path: PathBuf },
    /// Inline token (development only)
    Static { token: String },
}

fn default_token_var() -> String {
    DEFAULT_TOKEN_VAR.to_string()
}

impl Default for SecretSource {
    fn default() -> Self {
        Self::Env {
            var: default_token_var(),
        }
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env { var } => f.debug_struct("Env").field("var", var).finish(),
            Self::File { path } => f.debug_struct("File").field("path", path).finish(),
            Self::Static { .. } => f.debug_struct("Static").finish_non_exhaustive(),
        }
    }
}

impl SecretSource {
    pub fn provider(&self) -> Arc<dyn SecretProvider> {
        match self {
            Self::Env { var } => Arc::new(EnvSecretProvider { var: var.clone() }),
            Self::File { path } => Arc::new(FileSecretProvider { path: path.clone() }),
            Self::Static { token } => Arc::new(StaticSecretProvider {
                token: token.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    var: String,
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn bearer_token(&self) -> Result<BearerToken, SecretError> {
        let value =
            std::env::var(&self.var).map_err(|_| SecretError::MissingVar(self.var.clone()))?;
        BearerToken::new(value)
    }
}

#[derive(Debug, Clone)]
pub struct FileSecretProvider {
    path: PathBuf,
}

#[async_trait]
impl SecretProvider for FileSecretProvider {
    async fn bearer_token(&self) -> Result<BearerToken, SecretError> {
        let value = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SecretError::Io {
                path: self.path.clone(),
                source,
            })?;
        BearerToken::new(value)
    }
}

#[derive(Clone)]
pub struct StaticSecretProvider {
    token: String,
}

impl fmt::Debug for StaticSecretProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSecretProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn bearer_token(&self) -> Result<BearerToken, SecretError> {
        BearerToken::new(&self.token)
    }
}
