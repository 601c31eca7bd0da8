//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON)
//!     → loader.rs (parse, locate `mcpServers`)
//!     → validation.rs (each entry → ServerSpec)
//!     → ConfigMap (validated, immutable)
//!
//! On change:
//!     watcher.rs thread receives fs events for the parent directory
//!     → debounce.rs collapses the burst into one signal
//!     → reload::bridge hands it to the runtime
//! ```
//!
//! # Design Decisions
//! - A config is accepted or rejected as a whole
//! - Specs are a sum type; the raw JSON never leaves this module
//! - The watcher thread never reads the file or touches mounted state

pub mod debounce;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ConfigMap, RemoteTransport, ServerSpec, WatchOptions};
pub use validation::{validate_server_config, ValidationError};
pub use watcher::{ConfigWatcher, WatchError};
