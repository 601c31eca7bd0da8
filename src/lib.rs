//! Hot-reloading service gateway library.

pub mod admin;
pub mod config;
pub mod context;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod reload;
pub mod routing;
pub mod security;
pub mod service;

pub use config::schema::{ConfigMap, ServerSpec};
pub use context::ServerContext;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
