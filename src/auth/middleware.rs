use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::AppState;

#[derive(Clone, Debug)]
pub struct AuthUser {
    pub username: String,
}

/// Extracts `Authorization: Bearer <token>`, resolves it against the
/// credential store, and inserts `AuthUser` into request extensions.
/// Tokens are never decoded locally — every token is opaque and only
/// meaningful via a store lookup.
/// The bearer is pulled out with `axum-extra`'s `TypedHeader` rather than a
/// hand-rolled header lookup, wrapped in `Option` so a missing header maps
/// to the same 401 a wrong/unknown token would (axum's own rejection for a
/// missing `TypedHeader` is a 400, which a missing-vs-invalid-token caller
/// shouldn't be able to tell apart).
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer.ok_or(StatusCode::UNAUTHORIZED)?;

    let username = state
        .engine
        .resolve_token(token.token())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(AuthUser { username });
    Ok(next.run(request).await)
}
