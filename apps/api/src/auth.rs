//! Staff identity.
//!
//! Login and session handling live in the gateway in front of this service.
//! The gateway forwards the authenticated staff id in `X-User-Id`.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated staff member performing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub Uuid);

/// Reads the forwarded staff id; `None` when missing or not a UUID.
pub fn user_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id_from_headers(&parts.headers)
            .map(Actor)
            .ok_or(AppError::Unauthorized)
    }
}

/// Route layer for everything under `/api`: requests without a valid
/// `X-User-Id` are answered with 401 before reaching a handler.
pub async fn require_actor(request: Request, next: Next) -> Response {
    if user_id_from_headers(request.headers()).is_none() {
        return AppError::Unauthorized.into_response();
    }
    next.run(request).await
}
