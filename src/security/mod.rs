//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request routed to a sub-service:
//!     → cors.rs (preflight and origin policy)
//!     → access_control.rs (bearer API key, when configured)
//!     → sub-service handlers
//! ```
//!
//! # Design Decisions
//! - Policy is owned by the gateway and copied into each sub-service when
//!   it is built; a reload picks up the policy in force at that moment
//! - Fail closed: a configured key is required on every non-exempt route

pub mod access_control;
pub mod cors;
