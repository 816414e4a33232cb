use crate::{
    AppState,
    auth::{self, AuthUser, MaybeUser, Principal, password},
    error::{ApiError, AuthError, ErrorBody},
    models::{
        AdminDashboardStats, Comment, CommentRequest, CreatePostRequest, CredentialsRequest,
        LikeResponse, Post, Role, SubscriptionResponse, UpdatePostRequest, UserProfile,
    },
    policy::{self, Access, Transition, Visibility},
    repository::NewUser,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

// --- Input Validation ---

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
const MIN_PASSWORD_LEN: usize = 8;

fn validate_credentials(req: &CredentialsRequest) -> Result<(), ApiError> {
    if !USERNAME_LEN.contains(&req.username.len())
        || !req
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::BadRequest(
            "username must be 3-32 characters of letters, digits or underscore".into(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

fn profile_of(principal: &Principal) -> UserProfile {
    UserProfile {
        id: principal.id,
        username: principal.username.clone(),
        role: principal.role,
    }
}

/// Issues a token for `user_id` and adds the session cookie to `jar`.
fn start_session(state: &AppState, jar: CookieJar, user_id: Uuid) -> Result<CookieJar, ApiError> {
    let token = state
        .tokens
        .issue(user_id)
        .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;
    Ok(jar.add(auth::session_cookie(
        token,
        state.tokens.ttl(),
        &state.config.cookie,
    )))
}

// --- Account Handlers ---

/// register
///
/// [Public Route, rate limited] Creates a USER account and signs the caller in.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Registered; session cookie set", body = UserProfile),
        (status = 400, description = "Invalid username or password", body = ErrorBody),
        (status = 409, description = "Username taken", body = ErrorBody),
        (status = 429, description = "Too many attempts", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_credentials(&payload)?;

    let password_hash = password::hash_password(payload.password, state.config.password_cost).await?;
    let user = state
        .repo
        .create_user(NewUser {
            username: payload.username,
            password_hash,
            role: Role::User,
        })
        .await?;

    tracing::info!(user_id = %user.id, "Account registered");
    let jar = start_session(&state, jar, user.id)?;
    Ok((StatusCode::CREATED, jar, Json(UserProfile::from(&user))))
}

/// login
///
/// [Public Route, rate limited] Exchanges a username and password for a session cookie.
///
/// An unknown username and a wrong password produce the same 401.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = UserProfile),
        (status = 401, description = "Bad credentials", body = ErrorBody),
        (status = 403, description = "Account banned", body = ErrorBody),
        (status = 429, description = "Too many attempts", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(user) = state.repo.find_user_by_username(&payload.username).await? else {
        // Same bcrypt work as a wrong password, so timing does not reveal the account.
        let hash = password::dummy_hash(state.config.password_cost).await?;
        password::verify_password(payload.password, hash).await?;
        return Err(AuthError::InvalidCredentials.into());
    };
    if !password::verify_password(payload.password, user.password_hash.clone()).await? {
        return Err(AuthError::InvalidCredentials.into());
    }
    if user.banned {
        tracing::info!(user_id = %user.id, "Banned account attempted to log in");
        return Err(ApiError::Forbidden);
    }

    let jar = start_session(&state, jar, user.id)?;
    Ok((jar, Json(UserProfile::from(&user))))
}

/// logout
///
/// [Public Route] Tells the browser to discard the session cookie.
///
/// The token itself stays valid until it expires.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Cookie cleared"))
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (jar.add(auth::removal_cookie(&state.config.cookie)), StatusCode::NO_CONTENT)
}

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn get_me(AuthUser(principal): AuthUser) -> Json<UserProfile> {
    Json(profile_of(&principal))
}

// --- Post Handlers ---

/// list_posts
///
/// [Public Route] All posts, newest first, minus anything the caller may not read.
#[utoipa::path(
    get,
    path = "/posts",
    responses((status = 200, description = "Visible posts", body = [Post]))
)]
pub async fn list_posts(
    MaybeUser(principal): MaybeUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state.repo.list_posts().await?;
    Ok(Json(policy::filter_visible(posts, principal.as_ref())))
}

/// get_post
///
/// [Public Route] A single post. Hidden posts are 404 for everyone but admins.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_post(
    MaybeUser(principal): MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, ApiError> {
    let post = state.repo.find_post(id).await?;
    Ok(Json(policy::authorize(post, principal.as_ref(), Access::Read)?))
}

/// list_user_posts
///
/// [Public Route] One author's posts, filtered like the main listing.
#[utoipa::path(
    get,
    path = "/users/{id}/posts",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Visible posts by the author", body = [Post]),
        (status = 404, description = "Unknown author", body = ErrorBody)
    )
)]
pub async fn list_user_posts(
    MaybeUser(principal): MaybeUser,
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
) -> Result<Json<Vec<Post>>, ApiError> {
    if state.repo.find_user_by_id(author_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    let posts = state.repo.list_posts_by_authors(&[author_id]).await?;
    Ok(Json(policy::filter_visible(posts, principal.as_ref())))
}

/// create_post
///
/// [Authenticated Route] Publishes a new post owned by the caller.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Empty title or body", body = ErrorBody)
    )
)]
pub async fn create_post(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    require_text("title", &payload.title)?;
    require_text("body", &payload.body)?;
    let post = state.repo.create_post(principal.id, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Authenticated Route] Edits a post. Author or admin only.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_post(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let post = state.repo.find_post(id).await?;
    let post = policy::authorize(post, Some(&principal), Access::Modify)?;

    if let Some(title) = &payload.title {
        require_text("title", title)?;
    }
    if let Some(body) = &payload.body {
        require_text("body", body)?;
    }

    // The row can disappear between the check and the write.
    let updated = state
        .repo
        .update_post(post.id, payload)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(updated))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post with its comments and likes. Author or admin only.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_post(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let post = state.repo.find_post(id).await?;
    let post = policy::authorize(post, Some(&principal), Access::Modify)?;

    if state.repo.delete_post(post.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn set_post_visibility(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    target: Visibility,
) -> Result<Post, ApiError> {
    let post = state.repo.find_post(id).await?;
    match policy::plan_transition(post.as_ref(), Some(principal), target)? {
        Transition::Unchanged => post.ok_or(ApiError::NotFound),
        Transition::Apply { hidden } => {
            tracing::info!(post_id = %id, by = %principal.id, hidden, "Post visibility changed");
            state
                .repo
                .set_post_hidden(id, hidden)
                .await?
                .ok_or(ApiError::NotFound)
        }
    }
}

/// hide_post
///
/// [Authenticated Route] Hides a post. Idempotent; author or admin only.
#[utoipa::path(
    put,
    path = "/posts/{id}/hide",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Hidden", body = Post),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn hide_post(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, ApiError> {
    set_post_visibility(&state, &principal, id, Visibility::Hidden)
        .await
        .map(Json)
}

/// unhide_post
///
/// [Authenticated Route] Makes a hidden post visible again. In practice only
/// admins can reach a hidden post.
#[utoipa::path(
    put,
    path = "/posts/{id}/unhide",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Visible", body = Post),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn unhide_post(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, ApiError> {
    set_post_visibility(&state, &principal, id, Visibility::Visible)
        .await
        .map(Json)
}

/// toggle_like
///
/// [Authenticated Route] Likes or un-likes a post the caller can read.
#[utoipa::path(
    post,
    path = "/posts/{id}/like",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Toggled", body = LikeResponse),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn toggle_like(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeResponse>, ApiError> {
    let post = state.repo.find_post(id).await?;
    let post = policy::authorize(post, Some(&principal), Access::Read)?;

    let liked = state.repo.toggle_like(post.id, principal.id).await?;
    let likes = state.repo.count_likes(post.id).await?;
    Ok(Json(LikeResponse { liked, likes }))
}

// --- Comment Handlers ---

/// Loads a comment together with its parent post.
async fn load_comment(
    state: &AppState,
    id: Uuid,
) -> Result<(Option<Post>, Option<Comment>), ApiError> {
    let Some(comment) = state.repo.find_comment(id).await? else {
        return Ok((None, None));
    };
    let post = state.repo.find_post(comment.post_id).await?;
    Ok((post, Some(comment)))
}

/// list_comments
///
/// [Public Route] Comments on a readable post, oldest first, filtered per comment.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Visible comments", body = [Comment]),
        (status = 404, description = "Post not found", body = ErrorBody)
    )
)]
pub async fn list_comments(
    MaybeUser(principal): MaybeUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let post = state.repo.find_post(post_id).await?;
    let post = policy::authorize(post, principal.as_ref(), Access::Read)?;

    let comments = state.repo.list_comments(post.id).await?;
    Ok(Json(policy::filter_visible(comments, principal.as_ref())))
}

/// create_comment
///
/// [Authenticated Route] Comments on a post the caller can read.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 404, description = "Post not found", body = ErrorBody)
    )
)]
pub async fn create_comment(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let post = state.repo.find_post(post_id).await?;
    let post = policy::authorize(post, Some(&principal), Access::Read)?;
    require_text("body", &payload.body)?;

    let comment = state
        .repo
        .create_comment(post.id, principal.id, payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// update_comment
///
/// [Authenticated Route] Edits a comment. Author or admin only.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_comment(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let (post, comment) = load_comment(&state, id).await?;
    policy::decide_nested(post.as_ref(), comment.as_ref(), Some(&principal), Access::Modify)
        .into_result()?;
    let comment = comment.ok_or(ApiError::NotFound)?;
    require_text("body", &payload.body)?;

    let updated = state
        .repo
        .update_comment(comment.id, payload.body)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(updated))
}

/// delete_comment
///
/// [Authenticated Route] Deletes a comment. Author or admin only.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_comment(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let (post, comment) = load_comment(&state, id).await?;
    policy::decide_nested(post.as_ref(), comment.as_ref(), Some(&principal), Access::Modify)
        .into_result()?;
    let comment = comment.ok_or(ApiError::NotFound)?;

    if state.repo.delete_comment(comment.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn set_comment_visibility(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    target: Visibility,
) -> Result<Comment, ApiError> {
    let (post, comment) = load_comment(state, id).await?;
    // A comment under a post the caller cannot read does not exist for them.
    policy::decide(post.as_ref(), Some(principal), Access::Read).into_result()?;
    match policy::plan_transition(comment.as_ref(), Some(principal), target)? {
        Transition::Unchanged => comment.ok_or(ApiError::NotFound),
        Transition::Apply { hidden } => {
            tracing::info!(comment_id = %id, by = %principal.id, hidden, "Comment visibility changed");
            state
                .repo
                .set_comment_hidden(id, hidden)
                .await?
                .ok_or(ApiError::NotFound)
        }
    }
}

/// hide_comment
///
/// [Authenticated Route] Hides a comment. Idempotent; author or admin only.
#[utoipa::path(
    put,
    path = "/comments/{id}/hide",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Hidden", body = Comment),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn hide_comment(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Comment>, ApiError> {
    set_comment_visibility(&state, &principal, id, Visibility::Hidden)
        .await
        .map(Json)
}

/// unhide_comment
///
/// [Authenticated Route] Makes a hidden comment visible again.
#[utoipa::path(
    put,
    path = "/comments/{id}/unhide",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Visible", body = Comment),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn unhide_comment(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Comment>, ApiError> {
    set_comment_visibility(&state, &principal, id, Visibility::Visible)
        .await
        .map(Json)
}

// --- Subscription Handlers ---

/// Shared checks for both subscription directions.
async fn subscription_target(
    state: &AppState,
    principal: &Principal,
    author_id: Uuid,
) -> Result<(), ApiError> {
    if author_id == principal.id {
        return Err(ApiError::BadRequest("cannot subscribe to yourself".into()));
    }
    if state.repo.find_user_by_id(author_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    Ok(())
}

/// subscribe
///
/// [Authenticated Route] Follows an author. Repeating the call is a no-op.
#[utoipa::path(
    post,
    path = "/users/{id}/subscribe",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Subscribed", body = SubscriptionResponse),
        (status = 400, description = "Self subscription", body = ErrorBody),
        (status = 404, description = "Unknown author", body = ErrorBody)
    )
)]
pub async fn subscribe(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    subscription_target(&state, &principal, author_id).await?;
    state.repo.subscribe(principal.id, author_id).await?;
    Ok(Json(SubscriptionResponse {
        author_id,
        subscribed: true,
    }))
}

/// unsubscribe
///
/// [Authenticated Route] Stops following an author. Repeating the call is a no-op.
#[utoipa::path(
    delete,
    path = "/users/{id}/subscribe",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Unsubscribed", body = SubscriptionResponse),
        (status = 404, description = "Unknown author", body = ErrorBody)
    )
)]
pub async fn unsubscribe(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    subscription_target(&state, &principal, author_id).await?;
    state.repo.unsubscribe(principal.id, author_id).await?;
    Ok(Json(SubscriptionResponse {
        author_id,
        subscribed: false,
    }))
}

/// get_feed
///
/// [Authenticated Route] Posts from every subscribed author, newest first, filtered.
#[utoipa::path(
    get,
    path = "/me/feed",
    responses((status = 200, description = "Feed", body = [Post]))
)]
pub async fn get_feed(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let authors = state.repo.list_subscriptions(principal.id).await?;
    if authors.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let posts = state.repo.list_posts_by_authors(&authors).await?;
    Ok(Json(policy::filter_visible(posts, Some(&principal))))
}

// --- Admin Handlers ---

/// get_admin_stats
///
/// [Admin Route] Moderation dashboard counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn get_admin_stats(
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, ApiError> {
    Ok(Json(state.repo.get_stats().await?))
}

async fn set_banned(
    state: &AppState,
    admin: &Principal,
    user_id: Uuid,
    banned: bool,
) -> Result<StatusCode, ApiError> {
    if banned && user_id == admin.id {
        return Err(ApiError::BadRequest("administrators cannot ban themselves".into()));
    }
    let user = state
        .repo
        .set_user_banned(user_id, banned)
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::warn!(user_id = %user.id, by = %admin.id, banned, "Account ban state changed");
    Ok(StatusCode::NO_CONTENT)
}

/// ban_user
///
/// [Admin Route] Bans an account. Every later request carrying its token gets 403.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/ban",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Banned"),
        (status = 400, description = "Self ban", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn ban_user(
    AuthUser(admin): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    set_banned(&state, &admin, user_id, true).await
}

/// unban_user
///
/// [Admin Route] Lifts a ban.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/unban",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Unbanned"),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn unban_user(
    AuthUser(admin): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    set_banned(&state, &admin, user_id, false).await
}
