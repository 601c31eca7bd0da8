//! Sub-service construction.
//!
//! # Data Flow
//! ```text
//! (name, ServerSpec, GatewayPolicy)
//!     → SubAppFactory::create
//!     → SubApp { router, torn_down }
//!     → mounted by the reload coordinator under the service's path
//! ```
//!
//! # Design Decisions
//! - The factory is a trait object held by the server context, so tests and
//!   embedders can swap construction without touching reconciliation
//! - Construction may suspend (I/O); the future is boxed to stay object safe
//! - Sub-services own no processes or sockets, so tearing one down only marks
//!   it released; requests already holding the handle finish normally

pub mod factory;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;

use crate::config::schema::ServerSpec;

pub use factory::RouterFactory;

/// Error raised while constructing a sub-service.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Policy the gateway copies into every sub-service it builds.
#[derive(Debug, Clone)]
pub struct GatewayPolicy {
    pub api_key: Option<String>,
    pub strict_auth: bool,
    pub cors_allow_origins: Vec<String>,
}

impl Default for GatewayPolicy {
    fn default() -> Self {
        Self {
            api_key: None,
            strict_auth: false,
            cors_allow_origins: vec!["*".to_string()],
        }
    }
}

/// A constructed, mountable sub-service.
#[derive(Debug)]
pub struct SubApp {
    name: String,
    spec: ServerSpec,
    router: Router,
    torn_down: AtomicBool,
}

impl SubApp {
    pub fn new(name: impl Into<String>, spec: ServerSpec, router: Router) -> Self {
        Self {
            name: name.into(),
            spec,
            router,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Router to dispatch a request into. Cheap to clone.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Mark the service released. Safe to call more than once.
    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::SeqCst) {
            tracing::debug!(service = %self.name, kind = self.spec.kind(), "Tearing down sub-service");
        }
    }
}

pub type BuildFuture<'a> = Pin<Box<dyn Future<Output = Result<SubApp, BuildError>> + Send + 'a>>;

/// Builds sub-services from their specs.
pub trait SubAppFactory: Send + Sync {
    fn create<'a>(&'a self, name: &'a str, spec: &'a ServerSpec, policy: &'a GatewayPolicy) -> BuildFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_teardown_marks_released_and_keeps_router_usable() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let spec = ServerSpec::Local {
            command: "echo".into(),
            args: vec![],
            env: Default::default(),
        };
        let router = Router::new().route("/", axum::routing::get(|| async { "ok" }));
        let app = SubApp::new("a", spec, router);
        let held = app.router();

        assert!(!app.is_torn_down());
        app.teardown();
        app.teardown();
        assert!(app.is_torn_down());

        // A request that already holds the router still completes.
        let res = held
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
