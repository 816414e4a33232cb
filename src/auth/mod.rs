use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::CookieSettings,
    error::{ApiError, AuthError},
    models::{Role, User},
    repository::Repository,
};

pub mod password;
pub mod token;

pub use token::{Claims, TokenCodec};

/// Name of the `HttpOnly` cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Principal
///
/// The authenticated identity for exactly one request. Built from a verified
/// token's subject plus a fresh lookup of the account, so a role change or ban
/// takes effect on the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub banned: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role(),
            banned: user.banned,
        }
    }
}

/// Pulls every presented token from the request: the session cookie first,
/// then an `Authorization: Bearer` header for non-browser clients.
pub fn token_candidates(headers: &HeaderMap) -> Vec<String> {
    let mut tokens = Vec::with_capacity(2);
    if let Some(cookie) = CookieJar::from_headers(headers).get(TOKEN_COOKIE) {
        tokens.push(cookie.value().to_string());
    }
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        tokens.push(bearer.to_string());
    }
    tokens
}

/// resolve_principal
///
/// Turns a raw token into a `Principal`: verify the token, then look the
/// subject up in the account store.
///
/// # Errors
/// `ApiError::Unauthorized` carries the specific `AuthError` so the caller can
/// log it. Repository failures propagate unchanged.
pub async fn resolve_principal(
    codec: &TokenCodec,
    repo: &dyn Repository,
    token: Option<&str>,
) -> Result<Principal, ApiError> {
    let token = token.ok_or(AuthError::Missing)?;
    let claims = codec.verify(token)?;
    let user = repo
        .find_user_by_id(claims.sub)
        .await?
        .ok_or(AuthError::UnknownSubject)?;
    Ok(Principal::from(&user))
}

/// Resolves the first of `tokens` that yields a principal, so a stale cookie
/// does not shadow a valid bearer header.
///
/// # Errors
/// The last credential failure when no token resolves. Repository failures
/// stop the search and propagate.
pub async fn resolve_first(
    codec: &TokenCodec,
    repo: &dyn Repository,
    tokens: &[String],
) -> Result<Principal, ApiError> {
    let mut failure = AuthError::Missing;
    for token in tokens {
        match resolve_principal(codec, repo, Some(token)).await {
            Err(ApiError::Unauthorized(reason)) => failure = reason,
            outcome => return outcome,
        }
    }
    Err(failure.into())
}

/// Builds the session cookie for a freshly issued token.
pub fn session_cookie(token: String, ttl: Duration, settings: &CookieSettings) -> Cookie<'static> {
    let max_age = time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(settings.same_site)
        .max_age(max_age)
        .build()
}

/// Builds a cookie that instructs the browser to discard the session token.
///
/// This is the whole of logout: a copied token stays valid until it expires.
pub fn removal_cookie(settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(settings.same_site)
        .max_age(time::Duration::ZERO)
        .build()
}

/// AuthUser Extractor
///
/// Yields the principal attached by the authentication stage. Rejects with 401
/// when the request is anonymous. Handlers receive the principal as an
/// ordinary argument and pass it on explicitly.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized(AuthError::Missing))
    }
}

/// MaybeUser Extractor
///
/// For public-but-personalized routes: the principal if one was resolved,
/// otherwise anonymous. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Principal>().cloned()))
    }
}
