//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! AppState carries the [`CheckInCoordinator`] (which owns the participant
//! store), the process-wide [`ApiMetrics`] and the startup configuration.
//! Which store backs the coordinator is decided once at startup and recorded
//! in [`StoreBackend`] for the readiness probe and logs.

use std::path::PathBuf;
use std::sync::Arc;

use evreg_core::{CheckInCoordinator, InMemoryParticipantStore, ParticipantStore};
use thiserror::Error;

use crate::middleware::metrics::ApiMetrics;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

// -- Configuration -------------------------------------------------------------

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Invalid configuration value found at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORT must be a number between 1 and 65535, got {0:?}")]
    InvalidPort(String),

    #[error("LOG_FORMAT must be \"text\" or \"json\", got {0:?}")]
    InvalidLogFormat(String),
}

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` and `database_url` to prevent
/// credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Bearer secret shared by door staff. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Postgres URL. If `None`, participants live in memory.
    pub database_url: Option<String>,
    pub log_format: LogFormat,
    /// JSON file of participants imported at startup. Existing rows are kept.
    pub seed_path: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("log_format", &self.log_format)
            .field("seed_path", &self.seed_path)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auth_token: None,
            database_url: None,
            log_format: LogFormat::Text,
            seed_path: None,
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => return Err(ConfigError::InvalidPort(raw)),
            },
            None => DEFAULT_PORT,
        };

        let log_format = match var("LOG_FORMAT") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => return Err(ConfigError::InvalidLogFormat(raw)),
            },
            None => LogFormat::Text,
        };

        Ok(Self {
            port,
            auth_token: var("AUTH_TOKEN"),
            database_url: var("DATABASE_URL"),
            log_format,
            seed_path: var("PARTICIPANTS_SEED").map(PathBuf::from),
        })
    }
}

// -- Application State ---------------------------------------------------------

/// Which participant store backs the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
        }
    }
}

/// Shared application state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub coordinator: CheckInCoordinator,
    pub backend: StoreBackend,
    pub metrics: ApiMetrics,
    pub config: AppConfig,
}

impl AppState {
    /// Default configuration over an empty in-memory store.
    pub fn new() -> Self {
        Self::in_memory(AppConfig::default(), InMemoryParticipantStore::new())
    }

    /// State over an in-memory store.
    pub fn in_memory(config: AppConfig, store: InMemoryParticipantStore) -> Self {
        Self::with_store(config, Arc::new(store), StoreBackend::Memory)
    }

    /// State over any participant store.
    pub fn with_store(
        config: AppConfig,
        store: Arc<dyn ParticipantStore>,
        backend: StoreBackend,
    ) -> Self {
        Self {
            coordinator: CheckInCoordinator::new(store),
            backend,
            metrics: ApiMetrics::new(),
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
