//! Request dispatch against the live mount table.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use mountgate::lifecycle::Shutdown;
use mountgate::reload;
use mountgate::service::{GatewayPolicy, RouterFactory};
use mountgate::{HttpServer, ServerContext};

mod common;

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let res = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_routes_follow_reloads() {
    let ctx = common::context();
    let router = HttpServer::build_router(ctx.clone(), None);

    reload::reload(&ctx, br#"{"mcpServers": {"a": {"command": "echo"}, "b": {"url": "http://localhost:9/sse"}}}"#)
        .await
        .unwrap();

    let (status, body) = get(&router, "/a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "a");
    assert_eq!(body["kind"], "local");

    let (status, body) = get(&router, "/b/health?verbose=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    reload::reload(&ctx, br#"{"mcpServers": {"b": {"url": "http://localhost:9/sse"}}}"#)
        .await
        .unwrap();

    let (status, body) = get(&router, "/a").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("'a'"));

    let (status, body) = get(&router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generation"], 2);
    assert_eq!(body["services"][0]["path"], "/b");
}

#[tokio::test]
async fn test_path_prefix_and_policy() {
    let policy = GatewayPolicy {
        api_key: Some("secret".into()),
        ..GatewayPolicy::default()
    };
    let ctx = Arc::new(ServerContext::new(policy, Arc::new(RouterFactory)).with_path_prefix("/tools"));
    reload::reload(&ctx, br#"{"mcpServers": {"time": {"command": "uvx", "args": ["mcp-server-time"]}}}"#)
        .await
        .unwrap();
    let router = HttpServer::build_router(ctx.clone(), None);

    let (status, _) = get(&router, "/time").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&router, "/tools/time").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let res = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/tools/time")
                .header("Authorization", "Bearer secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_admin_api() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    common::write_config(&path, r#"{"mcpServers": {"a": {"command": "echo"}}}"#);

    let ctx = Arc::new(
        ServerContext::new(GatewayPolicy::default(), Arc::new(RouterFactory)).with_config_path(&path),
    );
    let router = HttpServer::build_router(ctx.clone(), Some("admin".into()));

    let (status, _) = get(&router, "/_admin/status").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let res = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_admin/reload")
                .header("Authorization", "Bearer admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(res.into_body(), 1 << 20).await.unwrap()).unwrap();
    assert_eq!(body["added"][0], "a");

    common::write_config(&path, "{not json");
    let res = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_admin/reload")
                .header("Authorization", "Bearer admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(common::mounted(&ctx), vec!["a"]);

    let res = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/_admin/status")
                .header("Authorization", "Bearer admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&to_bytes(res.into_body(), 1 << 20).await.unwrap()).unwrap();
    assert_eq!(body["mounted"], 1);
    assert_eq!(body["reloads"]["attempts"], 2);
    assert_eq!(body["reloads"]["rejected"], 1);
}

#[tokio::test]
async fn test_serves_over_tcp_until_shutdown() {
    let ctx = common::context();
    reload::reload(&ctx, br#"{"mcpServers": {"a": {"command": "echo"}}}"#)
        .await
        .unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(ctx.clone(), None);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .get(format!("http://{}/a/health", addr))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(res.status(), 200);

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}
