use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Everything a signed-in user can do. Handlers receive the caller as an
/// `AuthUser` and pass it to the visibility policy for every ownership check.
///
/// Some paths also exist on the public router with a different method
/// (`GET /posts/{id}` vs `PUT /posts/{id}`); axum merges the method routers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // GET /me/feed
        // Posts from subscribed authors, filtered per item.
        .route("/me/feed", get(handlers::get_feed))
        // --- Posts ---
        .route("/posts", post(handlers::create_post))
        // PUT/DELETE /posts/{id}
        // Author or admin only; hidden posts are 404 for non-admins.
        .route(
            "/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        // PUT /posts/{id}/hide, PUT /posts/{id}/unhide
        // Idempotent moderation transitions.
        .route("/posts/{id}/hide", put(handlers::hide_post))
        .route("/posts/{id}/unhide", put(handlers::unhide_post))
        // POST /posts/{id}/like
        // Toggle. The post must be readable by the caller.
        .route("/posts/{id}/like", post(handlers::toggle_like))
        // --- Comments ---
        .route("/posts/{id}/comments", post(handlers::create_comment))
        .route(
            "/comments/{id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        .route("/comments/{id}/hide", put(handlers::hide_comment))
        .route("/comments/{id}/unhide", put(handlers::unhide_comment))
        // --- Subscriptions ---
        .route(
            "/users/{id}/subscribe",
            post(handlers::subscribe).delete(handlers::unsubscribe),
        )
}
