//! Shared utilities for integration tests.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mountgate::service::{GatewayPolicy, RouterFactory};
use mountgate::ServerContext;

/// A context with the default factory and policy.
pub fn context() -> Arc<ServerContext> {
    Arc::new(ServerContext::new(GatewayPolicy::default(), Arc::new(RouterFactory)))
}

/// Write `contents` to `path` in one call, as a simple editor would.
pub fn write_config(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_for<F>(timeout: Duration, check: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check()
}

/// Names currently mounted in `ctx`.
#[allow(dead_code)]
pub fn mounted(ctx: &ServerContext) -> Vec<String> {
    ctx.mounts().snapshot().names().map(str::to_string).collect()
}
