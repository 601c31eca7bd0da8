//! Hot reload subsystem.
//!
//! # Data Flow
//! ```text
//! config::watcher thread (debounced change signal)
//!     → bridge.rs (channel hop onto the tokio runtime)
//!     → settle delay, coalesce queued signals
//!     → coordinator.rs
//!         Validating → Diffing → Mounting → Committed
//!                  ↘ Rejected        ↘ RolledBack
//!     → routing::table publish
//! ```

pub mod bridge;
pub mod coordinator;
pub mod diff;

pub use bridge::{BridgeError, ReloadBridge, ReloadSignal};
pub use coordinator::{apply, reload, reload_from_path, ReloadError, ReloadOutcome, ReloadPhase};
pub use diff::ConfigDiff;
