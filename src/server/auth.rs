//! Sign-in, sign-out and "who am I" endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Json;
use tracing::warn;

use crate::backend::models::{AuthSession, Credentials, User};
use crate::backend::BackendError;
use crate::context::SiteContext;
use crate::server::error::PageError;

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn login(
    State(ctx): State<Arc<SiteContext>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthSession>, PageError> {
    match ctx.auth.login(ctx.api.as_ref(), &credentials).await {
        Ok(session) => Ok(Json(session)),
        Err(BackendError::Unauthorized) => Err(PageError::Unauthorized),
        Err(e) => {
            warn!(username = %credentials.username, error = %e, "Login failed at backend");
            ctx.health.record_backend_failure();
            Err(PageError::BackendUnavailable)
        }
    }
}

pub async fn logout(State(ctx): State<Arc<SiteContext>>, headers: HeaderMap) -> Result<StatusCode, PageError> {
    let token = bearer_token(&headers).ok_or(PageError::Unauthorized)?;
    if ctx.auth.logout(token).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(PageError::Unauthorized)
    }
}

pub async fn me(State(ctx): State<Arc<SiteContext>>, headers: HeaderMap) -> Result<Json<User>, PageError> {
    let token = bearer_token(&headers).ok_or(PageError::Unauthorized)?;
    ctx.auth
        .session(token)
        .await
        .map(Json)
        .ok_or(PageError::Unauthorized)
}
