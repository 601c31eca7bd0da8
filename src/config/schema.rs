//! Configuration schema definitions.
//!
//! The config file is a JSON object whose `mcpServers` key maps a service
//! name to a [`ServerSpec`]. Raw entries are checked by
//! [`validate_server_config`](crate::config::validation::validate_server_config)
//! before they become typed specs; nothing here is deserialized blindly.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level key holding the service map.
pub const SERVERS_KEY: &str = "mcpServers";

/// Default debounce window for the config watcher.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Streaming transport used to reach a remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteTransport {
    Sse,
    StreamableHttp,
}

impl RemoteTransport {
    /// Parse a `type` value, accepting the common spellings.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "sse" => Some(Self::Sse),
            "streamable-http" | "streamable_http" | "streamablehttp" => Some(Self::StreamableHttp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable-http",
        }
    }
}

/// One configured backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ServerSpec {
    /// A command launched locally and spoken to over stdio.
    Local {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    /// A backend reached over a streaming HTTP transport.
    Remote {
        transport: RemoteTransport,
        url: String,
        headers: BTreeMap<String, String>,
    },
}

impl ServerSpec {
    /// Short label used in logs and listings.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerSpec::Local { .. } => "local",
            ServerSpec::Remote { transport, .. } => transport.as_str(),
        }
    }
}

/// Validated service map, ordered by name.
pub type ConfigMap = BTreeMap<String, ServerSpec>;

/// Options for the config file watcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchOptions {
    /// The file to watch.
    pub config_path: PathBuf,

    /// Coalescing interval in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_window_ms: u64,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl WatchOptions {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            debounce_window_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_window_ms = ms;
        self
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }
}
