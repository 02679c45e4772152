//! Gateway configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use stela_core::{LedgerConfig, RetentionPolicy};

use crate::{DEFAULT_DATABASE, DEFAULT_HOST, DEFAULT_PORT};

/// Default upper bound for the `perPage` pagination parameter
pub const DEFAULT_MAX_PER_PAGE: u32 = 100;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Path to the SQLite commit database
    pub database_path: String,

    /// Largest accepted `perPage` value; larger requests are rejected,
    /// never silently clamped
    pub max_per_page: u32,

    /// Enable tracing
    pub tracing: bool,

    /// Core ledger configuration (difficulty, identity scheme, retention)
    pub ledger: LedgerConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_path: DEFAULT_DATABASE.to_string(),
            max_per_page: DEFAULT_MAX_PER_PAGE,
            tracing: true,
            ledger: LedgerConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from `STELA_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    ///
    /// Recognized: `STELA_HOST`, `STELA_PORT`, `STELA_DATABASE`,
    /// `STELA_DIFFICULTY`, `STELA_RETENTION_DAYS`, `STELA_MAX_PER_PAGE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ledger = LedgerConfig::default()
            .with_difficulty(env_parse("STELA_DIFFICULTY", defaults.ledger.difficulty))
            .with_retention(RetentionPolicy::days(env_parse(
                "STELA_RETENTION_DAYS",
                defaults.ledger.retention.window_days,
            )));

        Self {
            host: std::env::var("STELA_HOST").unwrap_or(defaults.host),
            port: env_parse("STELA_PORT", defaults.port),
            database_path: std::env::var("STELA_DATABASE").unwrap_or(defaults.database_path),
            max_per_page: env_parse("STELA_MAX_PER_PAGE", defaults.max_per_page),
            tracing: defaults.tracing,
            ledger,
        }
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the database path
    pub fn with_database_path(mut self, path: impl Into<String>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Set the pagination bound
    pub fn with_max_per_page(mut self, max: u32) -> Self {
        self.max_per_page = max;
        self
    }

    /// Set the core ledger configuration
    pub fn with_ledger(mut self, ledger: LedgerConfig) -> Self {
        self.ledger = ledger;
        self
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("invalid socket address")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
