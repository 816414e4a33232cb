//! Authentication stages of the request chain.
//!
//! `authenticate` runs on every route and only attaches a `Principal` to the
//! request extensions. The group gates (`require_auth`, `require_admin`) are
//! route layers that read it back. Handlers get the principal through the
//! `AuthUser` / `MaybeUser` extractors.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::ApiError,
};

/// authenticate
///
/// Resolves the caller's credential, if any, into a `Principal`.
///
/// * Cookie and bearer tokens are tried in that order; the first that resolves wins.
/// * No credential, or none that verifies: the request continues
///   anonymously. The reason is logged, never returned.
/// * Valid credential for a banned account: 403 on every route.
/// * Repository failure: 500, never an anonymous downgrade.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let tokens = auth::token_candidates(request.headers());
    if tokens.is_empty() {
        return next.run(request).await;
    }

    match auth::resolve_first(&state.tokens, state.repo.as_ref(), &tokens).await {
        Ok(principal) if principal.banned => {
            tracing::warn!(user_id = %principal.id, "Rejected request from banned account");
            ApiError::Forbidden.into_response()
        }
        Ok(principal) => {
            tracing::debug!(user_id = %principal.id, "Principal resolved");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(ApiError::Unauthorized(reason)) => {
            tracing::debug!(reason = %reason, "Credential rejected; continuing anonymously");
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// require_auth
///
/// Gate for the authenticated group. The `AuthUser` extractor rejects with 401
/// before this body runs when no principal was attached.
pub async fn require_auth(_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// require_admin
///
/// Gate for the admin group: 401 when anonymous, 403 for a non-admin.
pub async fn require_admin(
    AuthUser(principal): AuthUser,
    request: Request,
    next: Next,
) -> Response {
    if !principal.is_admin() {
        tracing::info!(user_id = %principal.id, path = %request.uri().path(), "Admin route denied");
        return ApiError::Forbidden.into_response();
    }
    next.run(request).await
}
