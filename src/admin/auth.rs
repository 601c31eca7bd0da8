use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::security::access_control::bearer_token;

/// Key the admin API expects as a bearer token.
#[derive(Clone, Debug)]
pub struct AdminKey(pub String);

pub async fn admin_auth_middleware(
    State(key): State<AdminKey>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    match bearer_token(&request) {
        Some(token) if token == key.0 => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}
