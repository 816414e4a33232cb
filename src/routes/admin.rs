use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Moderation endpoints, nested under `/admin`. The `require_admin` route
/// layer rejects anonymous callers with 401 and non-admins with 403 before any
/// handler here runs.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Totals for users, posts and comments with their banned/hidden counts.
        .route("/stats", get(handlers::get_admin_stats))
        // PUT /admin/users/{id}/ban, PUT /admin/users/{id}/unban
        // A ban takes effect on the target's next request.
        .route("/users/{id}/ban", put(handlers::ban_user))
        .route("/users/{id}/unban", put(handlers::unban_user))
}
