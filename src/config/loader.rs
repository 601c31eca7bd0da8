//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::config::schema::{ConfigMap, SERVERS_KEY};
use crate::config::validation::{validate_servers, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Config must be a JSON object")]
    NotAnObject,

    #[error("No 'mcpServers' found in config")]
    MissingServersKey,

    #[error("'mcpServers' must be an object mapping names to server configs")]
    ServersNotAnObject,

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate raw config bytes.
pub fn parse_config(raw: &[u8]) -> Result<ConfigMap, ConfigError> {
    let root: Value = serde_json::from_slice(raw)?;
    let root = root.as_object().ok_or(ConfigError::NotAnObject)?;
    let servers = root
        .get(SERVERS_KEY)
        .ok_or(ConfigError::MissingServersKey)?
        .as_object()
        .ok_or(ConfigError::ServersNotAnObject)?;

    validate_servers(servers).map_err(ConfigError::Validation)
}

/// Load and validate configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<ConfigMap, ConfigError> {
    let content = fs::read(path)?;
    parse_config(&content)
}
