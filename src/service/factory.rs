//! Default sub-service factory.

use std::sync::Arc;

use axum::{extract::State, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use url::Url;

use crate::config::schema::ServerSpec;
use crate::security::access_control::{api_key_middleware, ApiKeyState};
use crate::security::cors::cors_layer;
use crate::service::{BuildError, BuildFuture, GatewayPolicy, SubApp, SubAppFactory};

/// Builds an axum router per service: `GET /` describes the backend and
/// `GET /health` reports liveness. The gateway policy is layered on top.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterFactory;

impl SubAppFactory for RouterFactory {
    fn create<'a>(&'a self, name: &'a str, spec: &'a ServerSpec, policy: &'a GatewayPolicy) -> BuildFuture<'a> {
        Box::pin(async move { build(name, spec, policy) })
    }
}

fn build(name: &str, spec: &ServerSpec, policy: &GatewayPolicy) -> Result<SubApp, BuildError> {
    if let ServerSpec::Remote { url, .. } = spec {
        check_url(url)?;
    }

    let mut router = Router::new()
        .route("/", get(describe_handler))
        .route("/health", get(health_handler))
        .with_state(Arc::new(describe(name, spec)));

    if let Some(api_key) = &policy.api_key {
        let state = ApiKeyState {
            api_key: api_key.clone(),
            strict: policy.strict_auth,
        };
        router = router.layer(middleware::from_fn_with_state(state, api_key_middleware));
    }
    router = router.layer(cors_layer(&policy.cors_allow_origins));

    tracing::debug!(service = %name, kind = spec.kind(), "Built sub-service");
    Ok(SubApp::new(name, spec.clone(), router))
}

fn check_url(raw: &str) -> Result<(), BuildError> {
    let url = Url::parse(raw).map_err(|e| BuildError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(BuildError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Public description of a backend. Env values and headers may carry
/// secrets, so only their names are listed.
fn describe(name: &str, spec: &ServerSpec) -> Value {
    match spec {
        ServerSpec::Local { command, args, env } => json!({
            "name": name,
            "kind": spec.kind(),
            "command": command,
            "args": args,
            "env": env.keys().collect::<Vec<_>>(),
        }),
        ServerSpec::Remote { url, headers, .. } => json!({
            "name": name,
            "kind": spec.kind(),
            "url": url,
            "headers": headers.keys().collect::<Vec<_>>(),
        }),
    }
}

async fn describe_handler(State(info): State<Arc<Value>>) -> Json<Value> {
    Json(info.as_ref().clone())
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RemoteTransport;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    fn local() -> ServerSpec {
        ServerSpec::Local {
            command: "echo".into(),
            args: vec!["hi".into()],
            env: [("TOKEN".to_string(), "secret".to_string())].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn test_describe_hides_env_values() {
        let app = RouterFactory
            .create("time", &local(), &GatewayPolicy::default())
            .await
            .unwrap();
        let res = app
            .router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["name"], "time");
        assert_eq!(value["env"], json!(["TOKEN"]));
        assert!(!String::from_utf8_lossy(&body).contains("secret"));
    }

    #[tokio::test]
    async fn test_remote_url_must_be_http() {
        let spec = ServerSpec::Remote {
            transport: RemoteTransport::Sse,
            url: "ftp://example.com/sse".into(),
            headers: BTreeMap::new(),
        };
        let err = RouterFactory
            .create("r", &spec, &GatewayPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_api_key_policy() {
        let policy = GatewayPolicy {
            api_key: Some("k".into()),
            ..GatewayPolicy::default()
        };
        let app = RouterFactory.create("time", &local(), &policy).await.unwrap();

        let denied = app
            .router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Authorization", "Bearer k")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);

        // Health stays open unless auth is strict.
        let health = app
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }
}
