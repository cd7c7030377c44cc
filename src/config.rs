use std::path::PathBuf;

use crate::query::DEFAULT_LIMIT;

// ============================================================================
// Service Configuration
// ============================================================================
//
// Read once at startup from LEDGER_* environment variables. Every variable is
// optional; an unparseable value aborts startup with the variable's name.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Backing store for update events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Scylla,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub store: StoreBackend,
    pub scylla_node: String,
    pub keyspace: String,
    pub seed_file: Option<PathBuf>,
    pub default_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            store: StoreBackend::Memory,
            scylla_node: "127.0.0.1:9042".to_string(),
            keyspace: "ledger_ks".to_string(),
            seed_file: None,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("LEDGER_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(port) = lookup("LEDGER_PORT") {
            config.port = parse_var("LEDGER_PORT", port)?;
        }
        if let Some(store) = lookup("LEDGER_STORE") {
            config.store = match store.trim().to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "scylla" => StoreBackend::Scylla,
                _ => return Err(ConfigError::InvalidValue { var: "LEDGER_STORE", value: store }),
            };
        }
        if let Some(node) = lookup("LEDGER_SCYLLA_NODE") {
            config.scylla_node = node;
        }
        if let Some(keyspace) = lookup("LEDGER_KEYSPACE") {
            if keyspace.is_empty() || !keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ConfigError::InvalidValue { var: "LEDGER_KEYSPACE", value: keyspace });
            }
            config.keyspace = keyspace;
        }
        if let Some(path) = lookup("LEDGER_SEED_FILE") {
            config.seed_file = Some(PathBuf::from(path));
        }
        if let Some(limit) = lookup("LEDGER_DEFAULT_LIMIT") {
            config.default_limit = parse_var("LEDGER_DEFAULT_LIMIT", limit)?;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { var, value })
}
