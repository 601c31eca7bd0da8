//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router: admin API, index, mounted services
//! - Wire up middleware (tracing, request ID)
//! - Dispatch each request to the sub-service mounted under its path,
//!   looked up in the current mount table snapshot
//! - Serve until the shutdown signal fires

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::admin::setup_admin_router;
use crate::context::ServerContext;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::error_response;
use crate::observability::metrics;

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    ctx: Arc<ServerContext>,
}

impl HttpServer {
    /// Create a new HTTP server. The admin API is mounted only with a key.
    pub fn new(ctx: Arc<ServerContext>, admin_key: Option<String>) -> Self {
        let router = Self::build_router(ctx.clone(), admin_key);
        Self { router, ctx }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(ctx: Arc<ServerContext>, admin_key: Option<String>) -> Router {
        let mut router = Router::new();
        if let Some(key) = admin_key {
            router = router.merge(setup_admin_router(key));
        }

        router
            .fallback(dispatch_handler)
            .with_state(ctx)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            prefix = self.ctx.prefix().as_str(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Routes a request to the mounted sub-service named by its first path segment.
async fn dispatch_handler(State(ctx): State<Arc<ServerContext>>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();

    if request.method() == Method::GET && ctx.prefix().is_index(&path) {
        return index(&ctx).into_response();
    }

    let Some((name, inner)) = ctx.prefix().resolve(&path) else {
        return error_response(StatusCode::NOT_FOUND, "Not Found");
    };

    // Only the lookup uses the snapshot; the cloned router keeps the
    // sub-service alive even if a reload unmounts it mid-request.
    let router = match ctx.mounts().snapshot().get(name) {
        Some(entry) => entry.handle.router(),
        None => {
            tracing::debug!(service = %name, path = %path, "No mounted service");
            metrics::record_request("none", 404);
            return error_response(StatusCode::NOT_FOUND, format!("Service '{}' is not mounted", name));
        }
    };

    let request = match rewrite_path(request, &inner) {
        Ok(r) => r,
        Err(()) => return error_response(StatusCode::BAD_REQUEST, "Invalid request path"),
    };

    let response = match router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    metrics::record_request(name, response.status().as_u16());
    response
}

/// Replace the request path with the path inside the sub-service, keeping the query.
fn rewrite_path(request: Request<Body>, inner: &str) -> Result<Request<Body>, ()> {
    let (mut parts, body) = request.into_parts();
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{}?{}", inner, query),
        None => inner.to_string(),
    };
    parts.uri = Uri::builder()
        .path_and_query(path_and_query)
        .build()
        .map_err(|_| ())?;
    Ok(Request::from_parts(parts, body))
}

fn index(ctx: &ServerContext) -> Json<serde_json::Value> {
    let table = ctx.mounts().snapshot();
    let services: Vec<_> = table
        .iter()
        .map(|entry| {
            json!({
                "name": entry.name,
                "path": ctx.prefix().mount_path(&entry.name),
                "kind": entry.spec.kind(),
            })
        })
        .collect();
    Json(json!({
        "generation": table.generation(),
        "services": services,
    }))
}
