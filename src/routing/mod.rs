//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (prefix → service name + inner path)
//!     → table.rs (snapshot lookup of the mounted sub-service)
//!     → sub-service router handles the rewritten request
//!
//! On reload:
//!     coordinator builds a complete new MountTable
//!     → table.rs publishes it with one atomic swap
//!     → in-flight requests finish against the snapshot they loaded
//! ```
//!
//! # Design Decisions
//! - The table is immutable once published
//! - Readers never lock; the coordinator is the only writer
//! - Deterministic: same table and path always resolve the same way

pub mod router;
pub mod table;

pub use router::PathPrefix;
pub use table::{MountEntry, MountTable, MountTableHandle};
