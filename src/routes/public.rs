use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Reads here are personalized when a
/// valid session is present (admins also see hidden content) and fall back to
/// anonymous otherwise; a bad token never turns into an error on these routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register, POST /auth/login
        // Both are metered per client IP by the rate-limit stage.
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        // POST /auth/logout
        // Clears the cookie only. Tokens are not revoked server side.
        .route("/auth/logout", post(handlers::logout))
        // GET /posts
        .route("/posts", get(handlers::list_posts))
        // GET /posts/{id}
        // Hidden and missing posts both answer 404.
        .route("/posts/{id}", get(handlers::get_post))
        // GET /posts/{id}/comments
        .route("/posts/{id}/comments", get(handlers::list_comments))
        // GET /users/{id}/posts
        .route("/users/{id}/posts", get(handlers::list_user_posts))
}
