use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware::{from_fn, from_fn_with_state},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access-control core.
pub mod auth;
pub mod clock;
pub mod policy;
pub mod rate_limit;

// Request chain, handlers and their supporting types.
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::TokenCodec;
pub use config::AppConfig;
pub use rate_limit::RateLimiters;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::logout, handlers::get_me,
        handlers::list_posts, handlers::get_post, handlers::list_user_posts,
        handlers::create_post, handlers::update_post, handlers::delete_post,
        handlers::hide_post, handlers::unhide_post, handlers::toggle_like,
        handlers::list_comments, handlers::create_comment, handlers::update_comment,
        handlers::delete_comment, handlers::hide_comment, handlers::unhide_comment,
        handlers::subscribe, handlers::unsubscribe, handlers::get_feed,
        handlers::get_admin_stats, handlers::ban_user, handlers::unban_user
    ),
    components(
        schemas(
            models::Role, models::Post, models::Comment, models::CredentialsRequest,
            models::CreatePostRequest, models::UpdatePostRequest, models::CommentRequest,
            models::UserProfile, models::LikeResponse, models::SubscriptionResponse,
            models::AdminDashboardStats, error::ErrorBody,
        )
    ),
    tags(
        (name = "blog-api", description = "Blog API with moderated content")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container of shared services. Cloned per request;
/// every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Persistence collaborator.
    pub repo: RepositoryState,
    /// The loaded configuration.
    pub config: AppConfig,
    /// Issues and verifies session tokens. Built from `config.jwt_secret` at boot.
    pub tokens: TokenCodec,
    /// Buckets for the rate-limited account routes.
    pub limiters: RateLimiters,
}

impl AppState {
    /// Assembles the state from already validated parts. Limiters are created
    /// from the configured per-route limits.
    pub fn new(repo: RepositoryState, config: AppConfig, tokens: TokenCodec) -> Self {
        let limiters = RateLimiters::new(config.login_limit, config.register_limit);
        Self {
            repo,
            config,
            tokens,
            limiters,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenCodec {
    fn from_ref(app_state: &AppState) -> TokenCodec {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for RateLimiters {
    fn from_ref(app_state: &AppState) -> RateLimiters {
        app_state.limiters.clone()
    }
}

/// create_router
///
/// Assembles the routing tree and the request chain. Stages, outermost first:
///
/// 1. CORS, request id and tracing.
/// 2. Rate limiting of `POST /auth/login` and `POST /auth/register`.
/// 3. Principal resolution (`middleware::authenticate`), including the global
///    banned-account rejection.
/// 4. Group gates: `require_auth` on the authenticated routes,
///    `require_admin` on `/admin`.
/// 5. The handler.
///
/// Each stage can answer the request itself; nothing after it runs.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(from_fn(middleware::require_auth)),
        )
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(from_fn(middleware::require_admin)),
        )
        .with_state(state.clone());

    // Layers added later wrap the ones added earlier, so this reads inside-out.
    base_router
        .layer(from_fn_with_state(state.clone(), middleware::authenticate))
        .layer(from_fn_with_state(
            state.limiters.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span with method, uri and the request id, so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
