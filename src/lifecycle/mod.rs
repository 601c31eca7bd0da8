//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Mount services → Start watcher → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Stop watcher → Drain reloads → Tear down services
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then services, then listeners
//! - The watcher is joined and the reload worker awaited before services
//!   are torn down, so no reload races the teardown

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
