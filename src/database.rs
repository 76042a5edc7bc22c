//! Connection configuration and command construction
//!
//! Connection configurations are registered once at process start under a
//! name; factories and transaction managers look them up by that name. The
//! backend registry maps a provider name (`"postgres"`, `"memory"`) to a
//! connection factory. Commands carry the procedure-or-text payload,
//! parameters, and an optional per-command timeout.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::backends::{share, Backend, PostgresBackend, SharedConnection};
use crate::error::{OrmError, OrmResult};
use crate::parameters::{Parameter, ParameterSet};

/// A named connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Backend provider name, e.g. `"postgres"` or `"memory"`
    pub provider: String,
    /// Connection URL for the provider
    pub url: String,
}

impl ConnectionConfig {
    pub fn new(provider: &str, url: &str) -> Self {
        Self {
            provider: provider.to_string(),
            url: url.to_string(),
        }
    }
}

static CONNECTIONS: Lazy<DashMap<String, ConnectionConfig>> = Lazy::new(DashMap::new);

static BACKENDS: Lazy<DashMap<String, Arc<dyn Backend>>> = Lazy::new(|| {
    let backends: DashMap<String, Arc<dyn Backend>> = DashMap::new();
    backends.insert("postgres".to_string(), Arc::new(PostgresBackend));
    backends
});

/// Register a connection configuration under a name.
///
/// Registration replaces any previous configuration of the same name. The
/// URL must parse; provider names are resolved lazily at open time.
pub fn register_connection(name: &str, config: ConnectionConfig) -> OrmResult<()> {
    if name.is_empty() {
        return Err(OrmError::Argument("connection name must not be empty".to_string()));
    }
    if config.provider.is_empty() {
        return Err(OrmError::Configuration(format!(
            "connection '{}' has no provider name",
            name
        )));
    }
    Url::parse(&config.url).map_err(|e| {
        OrmError::Configuration(format!("connection '{}' has an invalid url: {}", name, e))
    })?;
    CONNECTIONS.insert(name.to_string(), config);
    Ok(())
}

/// Register a backend under a provider name
pub fn register_backend(provider: &str, backend: Arc<dyn Backend>) {
    BACKENDS.insert(provider.to_string(), backend);
}

/// Resolves a named connection configuration to live connections
#[derive(Clone)]
pub struct DatabaseProvider {
    name: String,
    config: ConnectionConfig,
    backend: Arc<dyn Backend>,
}

impl DatabaseProvider {
    /// Look up the named configuration and its backend
    pub fn from_name(name: &str) -> OrmResult<Self> {
        if name.is_empty() {
            return Err(OrmError::Argument("connection name must not be empty".to_string()));
        }
        let config = CONNECTIONS
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| OrmError::ConfigurationMissing(name.to_string()))?;
        let backend = BACKENDS
            .get(&config.provider)
            .map(|entry| entry.clone())
            .ok_or_else(|| {
                OrmError::Configuration(format!(
                    "no backend registered for provider '{}'",
                    config.provider
                ))
            })?;
        Ok(Self {
            name: name.to_string(),
            config,
            backend,
        })
    }

    /// Name this provider was resolved under
    pub fn connection_name(&self) -> &str {
        &self.name
    }

    /// Open a fresh shared connection
    pub fn open(&self) -> OrmResult<SharedConnection> {
        tracing::debug!(connection = %self.name, provider = %self.config.provider, "opening connection");
        Ok(share(self.backend.connect(&self.config)?))
    }
}

impl std::fmt::Debug for DatabaseProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseProvider")
            .field("name", &self.name)
            .field("provider", &self.config.provider)
            .finish()
    }
}

/// How a command's text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `text` is a stored-procedure name
    Procedure,
    /// `text` is raw command text
    Text,
}

/// One executable command
#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CommandKind,
    pub text: String,
    pub parameters: Vec<Parameter>,
    pub timeout: Option<Duration>,
}

impl Command {
    /// A stored-procedure command
    pub fn procedure(name: &str) -> Self {
        Self {
            kind: CommandKind::Procedure,
            text: name.to_string(),
            parameters: Vec::new(),
            timeout: None,
        }
    }

    /// A raw-text command
    pub fn text(text: &str) -> Self {
        Self {
            kind: CommandKind::Text,
            text: text.to_string(),
            parameters: Vec::new(),
            timeout: None,
        }
    }

    /// Attach a parameter set
    pub fn with_parameters(mut self, parameters: Option<&ParameterSet>) -> Self {
        if let Some(set) = parameters {
            self.parameters = set.as_slice().to_vec();
        }
        self
    }

    /// Attach a per-command timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}
