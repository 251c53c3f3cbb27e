//! Bearer token guard for `/api/*`.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::api::ApiState;
use crate::errors::{ApiError, Result};

/// Rejects requests whose `Authorization: Bearer` token does not match the
/// configured one. With no token configured every request passes.
pub async fn require_bearer(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let verdict = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| bool::from(token.trim().as_bytes().ct_eq(expected.as_bytes())));

    match verdict {
        Some(true) => Ok(next.run(request).await),
        Some(false) => {
            debug!(path = %request.uri().path(), "Rejected bearer token");
            Err(ApiError::Unauthorized("invalid bearer token".to_string()))
        }
        None => Err(ApiError::Unauthorized("missing bearer token".to_string())),
    }
}
