pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::{admin_auth_middleware, AdminKey};
use self::handlers::*;
use crate::context::ServerContext;

pub fn setup_admin_router(api_key: String) -> Router<Arc<ServerContext>> {
    Router::new()
        .route("/_admin/status", get(get_status))
        .route("/_admin/mounts", get(get_mounts))
        .route("/_admin/reload", post(post_reload))
        .layer(middleware::from_fn_with_state(AdminKey(api_key), admin_auth_middleware))
}
