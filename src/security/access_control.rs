//! Bearer-token access control for mounted sub-services.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::response::error_response;

/// State required for API key checks.
#[derive(Clone, Debug)]
pub struct ApiKeyState {
    pub api_key: String,
    /// When false, `/health` stays reachable without a key.
    pub strict: bool,
}

pub async fn api_key_middleware(State(state): State<ApiKeyState>, req: Request<Body>, next: Next) -> Response {
    if !state.strict && req.uri().path() == "/health" {
        return next.run(req).await;
    }

    match bearer_token(&req) {
        Some(token) if token == state.api_key => next.run(req).await,
        Some(_) => error_response(StatusCode::FORBIDDEN, "Invalid API key"),
        None => error_response(StatusCode::UNAUTHORIZED, "Missing or invalid Authorization header"),
    }
}

/// Extract the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        let req = Request::builder()
            .header("Authorization", "Bearer top-secret")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&req), Some("top-secret"));

        let req = Request::builder().header("Authorization", "Basic abc").body(()).unwrap();
        assert_eq!(bearer_token(&req), None);
    }
}
