use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use blog_api::{
    AppState, TokenCodec,
    auth::{AuthUser, MaybeUser, Principal, password},
    config::AppConfig,
    error::ApiError,
    handlers,
    models::{
        AdminDashboardStats, Comment, CommentRequest, CreatePostRequest, CredentialsRequest,
        Post, Role, UpdatePostRequest, User,
    },
    repository::{NewUser, RepoResult, Repository},
};
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::test;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Canned rows in, recorded writes out. Handlers only see the trait, so every
// policy decision can be checked without a database.
#[derive(Default)]
pub struct MockRepoControl {
    pub users: Vec<User>,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub stats_to_return: AdminDashboardStats,
    pub writes: Mutex<Vec<String>>,
}

impl MockRepoControl {
    fn record(&self, call: impl Into<String>) {
        self.writes.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.username == username).cloned())
    }
    async fn create_user(&self, new_user: NewUser) -> RepoResult<User> {
        self.record("create_user");
        Ok(User {
            id: Uuid::new_v4(),
            username: new_user.username,
            password_hash: new_user.password_hash,
            role: new_user.role.as_str().to_string(),
            ..User::default()
        })
    }
    async fn set_user_banned(&self, id: Uuid, banned: bool) -> RepoResult<Option<User>> {
        self.record(format!("set_user_banned:{banned}"));
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_posts(&self) -> RepoResult<Vec<Post>> {
        Ok(self.posts.clone())
    }
    async fn list_posts_by_authors(&self, author_ids: &[Uuid]) -> RepoResult<Vec<Post>> {
        Ok(self
            .posts
            .iter()
            .filter(|p| author_ids.contains(&p.author_id))
            .cloned()
            .collect())
    }
    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        Ok(self.posts.iter().find(|p| p.id == id).cloned())
    }
    async fn create_post(&self, author_id: Uuid, req: CreatePostRequest) -> RepoResult<Post> {
        self.record("create_post");
        Ok(Post {
            id: Uuid::new_v4(),
            author_id,
            title: req.title,
            body: req.body,
            ..Post::default()
        })
    }
    async fn update_post(&self, id: Uuid, _req: UpdatePostRequest) -> RepoResult<Option<Post>> {
        self.record("update_post");
        self.find_post(id).await
    }
    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        self.record("delete_post");
        Ok(self.posts.iter().any(|p| p.id == id))
    }
    async fn set_post_hidden(&self, id: Uuid, hidden: bool) -> RepoResult<Option<Post>> {
        self.record(format!("set_post_hidden:{hidden}"));
        Ok(self
            .posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .map(|p| Post { hidden, ..p }))
    }

    async fn list_comments(&self, post_id: Uuid) -> RepoResult<Vec<Comment>> {
        Ok(self
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }
    async fn find_comment(&self, id: Uuid) -> RepoResult<Option<Comment>> {
        Ok(self.comments.iter().find(|c| c.id == id).cloned())
    }
    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        body: String,
    ) -> RepoResult<Comment> {
        self.record("create_comment");
        Ok(Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            body,
            ..Comment::default()
        })
    }
    async fn update_comment(&self, id: Uuid, _body: String) -> RepoResult<Option<Comment>> {
        self.record("update_comment");
        self.find_comment(id).await
    }
    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        self.record("delete_comment");
        Ok(self.comments.iter().any(|c| c.id == id))
    }
    async fn set_comment_hidden(&self, id: Uuid, hidden: bool) -> RepoResult<Option<Comment>> {
        self.record(format!("set_comment_hidden:{hidden}"));
        Ok(self
            .comments
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .map(|c| Comment { hidden, ..c }))
    }

    async fn toggle_like(&self, _post_id: Uuid, _user_id: Uuid) -> RepoResult<bool> {
        self.record("toggle_like");
        Ok(true)
    }
    async fn count_likes(&self, _post_id: Uuid) -> RepoResult<i64> {
        Ok(1)
    }

    async fn subscribe(&self, _subscriber_id: Uuid, _author_id: Uuid) -> RepoResult<bool> {
        self.record("subscribe");
        Ok(true)
    }
    async fn unsubscribe(&self, _subscriber_id: Uuid, _author_id: Uuid) -> RepoResult<bool> {
        self.record("unsubscribe");
        Ok(true)
    }
    async fn list_subscriptions(&self, _subscriber_id: Uuid) -> RepoResult<Vec<Uuid>> {
        Ok(self.users.iter().map(|u| u.id).collect())
    }

    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        Ok(self.stats_to_return.clone())
    }
}

// --- Fixtures ---

const AUTHOR_ID: Uuid = Uuid::from_u128(1);
const STRANGER_ID: Uuid = Uuid::from_u128(2);
const ADMIN_ID: Uuid = Uuid::from_u128(3);
const VISIBLE_POST: Uuid = Uuid::from_u128(10);
const HIDDEN_POST: Uuid = Uuid::from_u128(11);
const COMMENT_ON_VISIBLE: Uuid = Uuid::from_u128(20);
const COMMENT_ON_HIDDEN: Uuid = Uuid::from_u128(21);
const HIDDEN_COMMENT: Uuid = Uuid::from_u128(22);

fn principal(id: Uuid, role: Role) -> Principal {
    Principal {
        id,
        username: format!("user_{}", id.as_u128()),
        role,
        banned: false,
    }
}

fn author() -> Principal {
    principal(AUTHOR_ID, Role::User)
}

fn stranger() -> Principal {
    principal(STRANGER_ID, Role::User)
}

fn admin() -> Principal {
    principal(ADMIN_ID, Role::Admin)
}

fn post(id: Uuid, hidden: bool) -> Post {
    Post {
        id,
        author_id: AUTHOR_ID,
        title: format!("post {}", id.as_u128()),
        body: "body".into(),
        hidden,
        ..Post::default()
    }
}

fn comment(id: Uuid, post_id: Uuid, hidden: bool) -> Comment {
    Comment {
        id,
        post_id,
        author_id: AUTHOR_ID,
        body: "comment".into(),
        hidden,
        ..Comment::default()
    }
}

fn user_row(p: &Principal) -> User {
    User {
        id: p.id,
        username: p.username.clone(),
        role: p.role.as_str().to_string(),
        ..User::default()
    }
}

/// A repository with one visible and one hidden post by the author, each with comments.
fn seeded_repo() -> MockRepoControl {
    MockRepoControl {
        users: vec![user_row(&author()), user_row(&stranger()), user_row(&admin())],
        posts: vec![post(VISIBLE_POST, false), post(HIDDEN_POST, true)],
        comments: vec![
            comment(COMMENT_ON_VISIBLE, VISIBLE_POST, false),
            comment(COMMENT_ON_HIDDEN, HIDDEN_POST, false),
            comment(HIDDEN_COMMENT, VISIBLE_POST, true),
        ],
        ..MockRepoControl::default()
    }
}

fn create_test_state(repo: Arc<MockRepoControl>) -> AppState {
    let config = AppConfig::default();
    let tokens = TokenCodec::from_base64_secret(&config.jwt_secret, config.token_ttl).unwrap();
    AppState::new(repo, config, tokens)
}

fn state_with(repo: MockRepoControl) -> (AppState, Arc<MockRepoControl>) {
    let repo = Arc::new(repo);
    (create_test_state(repo.clone()), repo)
}

async fn body_bytes(response: Response) -> (StatusCode, Vec<u8>) {
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    (parts.status, bytes.to_vec())
}

fn status_of<T: IntoResponse>(result: Result<T, ApiError>) -> StatusCode {
    result.into_response().status()
}

// --- Post Visibility ---

#[test]
async fn test_author_of_hidden_post_gets_404() {
    let (state, _) = state_with(seeded_repo());
    let result = handlers::get_post(MaybeUser(Some(author())), State(state), Path(HIDDEN_POST)).await;
    assert_eq!(status_of(result), StatusCode::NOT_FOUND);
}

#[test]
async fn test_admin_reads_hidden_post() {
    let (state, _) = state_with(seeded_repo());
    let Json(found) =
        handlers::get_post(MaybeUser(Some(admin())), State(state), Path(HIDDEN_POST))
            .await
            .unwrap();
    assert_eq!(found.id, HIDDEN_POST);
    assert!(found.hidden);
}

#[test]
async fn test_hidden_and_missing_posts_are_indistinguishable() {
    let (state, _) = state_with(seeded_repo());

    let hidden = handlers::get_post(MaybeUser(Some(stranger())), State(state.clone()), Path(HIDDEN_POST))
        .await
        .into_response();
    let missing = handlers::get_post(MaybeUser(Some(stranger())), State(state), Path(Uuid::new_v4()))
        .await
        .into_response();

    let (hidden_status, hidden_body) = body_bytes(hidden).await;
    let (missing_status, missing_body) = body_bytes(missing).await;
    assert_eq!(hidden_status, StatusCode::NOT_FOUND);
    assert_eq!(hidden_status, missing_status);
    assert_eq!(hidden_body, missing_body);
}

#[test]
async fn test_list_posts_drops_hidden_items_for_non_admins() {
    let (state, _) = state_with(seeded_repo());

    for viewer in [None, Some(author()), Some(stranger())] {
        let Json(posts) = handlers::list_posts(MaybeUser(viewer), State(state.clone()))
            .await
            .unwrap();
        let ids: Vec<_> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![VISIBLE_POST]);
    }

    let Json(posts) = handlers::list_posts(MaybeUser(Some(admin())), State(state))
        .await
        .unwrap();
    assert_eq!(posts.len(), 2);
}

#[test]
async fn test_list_user_posts_unknown_author_is_404() {
    let (state, _) = state_with(seeded_repo());
    let result = handlers::list_user_posts(MaybeUser(None), State(state), Path(Uuid::new_v4())).await;
    assert_eq!(status_of(result), StatusCode::NOT_FOUND);
}

// --- Ownership ---

#[test]
async fn test_stranger_cannot_update_visible_post() {
    let (state, repo) = state_with(seeded_repo());
    let payload = UpdatePostRequest {
        title: Some("hijacked".into()),
        body: None,
    };

    let result = handlers::update_post(AuthUser(stranger()), State(state), Path(VISIBLE_POST), Json(payload)).await;

    assert_eq!(status_of(result), StatusCode::FORBIDDEN);
    assert!(repo.writes.lock().unwrap().is_empty());
}

#[test]
async fn test_author_cannot_update_own_hidden_post() {
    let (state, repo) = state_with(seeded_repo());
    let result = handlers::update_post(
        AuthUser(author()),
        State(state),
        Path(HIDDEN_POST),
        Json(UpdatePostRequest::default()),
    )
    .await;

    assert_eq!(status_of(result), StatusCode::NOT_FOUND);
    assert!(repo.writes.lock().unwrap().is_empty());
}

#[test]
async fn test_admin_deletes_any_post() {
    let (state, repo) = state_with(seeded_repo());
    let status = handlers::delete_post(AuthUser(admin()), State(state), Path(HIDDEN_POST))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(*repo.writes.lock().unwrap(), vec!["delete_post".to_string()]);
}

#[test]
async fn test_create_post_rejects_blank_title() {
    let (state, repo) = state_with(seeded_repo());
    let payload = CreatePostRequest {
        title: "   ".into(),
        body: "text".into(),
    };
    let result = handlers::create_post(AuthUser(author()), State(state), Json(payload)).await;
    assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
    assert!(repo.writes.lock().unwrap().is_empty());
}

// --- Hide / Unhide ---

#[test]
async fn test_hide_is_idempotent_for_admin() {
    let (state, repo) = state_with(seeded_repo());

    let Json(first) = handlers::hide_post(AuthUser(admin()), State(state.clone()), Path(VISIBLE_POST))
        .await
        .unwrap();
    assert!(first.hidden);

    // Already hidden: succeeds without another write.
    let Json(again) = handlers::hide_post(AuthUser(admin()), State(state), Path(HIDDEN_POST))
        .await
        .unwrap();
    assert!(again.hidden);

    assert_eq!(
        *repo.writes.lock().unwrap(),
        vec!["set_post_hidden:true".to_string()]
    );
}

#[test]
async fn test_author_hides_own_post_but_cannot_unhide_it() {
    let (state, _) = state_with(seeded_repo());

    let result = handlers::hide_post(AuthUser(author()), State(state.clone()), Path(VISIBLE_POST)).await;
    assert_eq!(status_of(result), StatusCode::OK);

    let result = handlers::unhide_post(AuthUser(author()), State(state), Path(HIDDEN_POST)).await;
    assert_eq!(status_of(result), StatusCode::NOT_FOUND);
}

#[test]
async fn test_stranger_cannot_hide_visible_post() {
    let (state, _) = state_with(seeded_repo());
    let result = handlers::hide_post(AuthUser(stranger()), State(state), Path(VISIBLE_POST)).await;
    assert_eq!(status_of(result), StatusCode::FORBIDDEN);
}

// --- Likes and Comments on Hidden Posts ---

#[test]
async fn test_like_on_hidden_post_is_404_and_not_recorded() {
    let (state, repo) = state_with(seeded_repo());
    let result = handlers::toggle_like(AuthUser(author()), State(state), Path(HIDDEN_POST)).await;
    assert_eq!(status_of(result), StatusCode::NOT_FOUND);
    assert!(repo.writes.lock().unwrap().is_empty());
}

#[test]
async fn test_like_on_visible_post() {
    let (state, _) = state_with(seeded_repo());
    let Json(like) = handlers::toggle_like(AuthUser(stranger()), State(state), Path(VISIBLE_POST))
        .await
        .unwrap();
    assert!(like.liked);
    assert_eq!(like.likes, 1);
}

#[test]
async fn test_comment_on_hidden_post_is_404() {
    let (state, repo) = state_with(seeded_repo());
    let payload = CommentRequest { body: "hi".into() };
    let result = handlers::create_comment(AuthUser(author()), State(state), Path(HIDDEN_POST), Json(payload)).await;
    assert_eq!(status_of(result), StatusCode::NOT_FOUND);
    assert!(repo.writes.lock().unwrap().is_empty());
}

#[test]
async fn test_list_comments_filters_hidden_comments() {
    let (state, _) = state_with(seeded_repo());

    let Json(comments) = handlers::list_comments(MaybeUser(None), State(state.clone()), Path(VISIBLE_POST))
        .await
        .unwrap();
    let ids: Vec<_> = comments.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![COMMENT_ON_VISIBLE]);

    let Json(comments) = handlers::list_comments(MaybeUser(Some(admin())), State(state.clone()), Path(VISIBLE_POST))
        .await
        .unwrap();
    assert_eq!(comments.len(), 2);

    let result = handlers::list_comments(MaybeUser(Some(author())), State(state), Path(HIDDEN_POST)).await;
    assert_eq!(status_of(result), StatusCode::NOT_FOUND);
}

#[test]
async fn test_comment_author_cannot_touch_comment_under_hidden_post() {
    let (state, repo) = state_with(seeded_repo());

    let result = handlers::delete_comment(AuthUser(author()), State(state.clone()), Path(COMMENT_ON_HIDDEN)).await;
    assert_eq!(status_of(result), StatusCode::NOT_FOUND);

    let result = handlers::hide_comment(AuthUser(author()), State(state), Path(COMMENT_ON_HIDDEN)).await;
    assert_eq!(status_of(result), StatusCode::NOT_FOUND);

    assert!(repo.writes.lock().unwrap().is_empty());
}

#[test]
async fn test_stranger_cannot_edit_visible_comment() {
    let (state, _) = state_with(seeded_repo());
    let payload = CommentRequest { body: "edited".into() };
    let result = handlers::update_comment(AuthUser(stranger()), State(state), Path(COMMENT_ON_VISIBLE), Json(payload)).await;
    assert_eq!(status_of(result), StatusCode::FORBIDDEN);
}

#[test]
async fn test_admin_unhides_hidden_comment() {
    let (state, repo) = state_with(seeded_repo());
    let Json(comment) = handlers::unhide_comment(AuthUser(admin()), State(state), Path(HIDDEN_COMMENT))
        .await
        .unwrap();
    assert!(!comment.hidden);
    assert_eq!(
        *repo.writes.lock().unwrap(),
        vec!["set_comment_hidden:false".to_string()]
    );
}

// --- Subscriptions and Feed ---

#[test]
async fn test_subscribe_to_self_is_400() {
    let (state, _) = state_with(seeded_repo());
    let result = handlers::subscribe(AuthUser(author()), State(state), Path(AUTHOR_ID)).await;
    assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_subscribe_to_unknown_user_is_404() {
    let (state, _) = state_with(seeded_repo());
    let result = handlers::subscribe(AuthUser(author()), State(state), Path(Uuid::new_v4())).await;
    assert_eq!(status_of(result), StatusCode::NOT_FOUND);
}

#[test]
async fn test_feed_is_filtered_per_item() {
    let (state, _) = state_with(seeded_repo());
    let Json(feed) = handlers::get_feed(AuthUser(stranger()), State(state))
        .await
        .unwrap();
    let ids: Vec<_> = feed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![VISIBLE_POST]);
}

// --- Accounts and Admin ---

#[test]
async fn test_register_rejects_invalid_username_before_touching_repo() {
    let (state, repo) = state_with(seeded_repo());
    let payload = CredentialsRequest {
        username: "no spaces!".into(),
        password: "long-enough-password".into(),
    };
    let result = handlers::register(State(state), CookieJar::new(), Json(payload)).await;
    assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
    assert!(repo.writes.lock().unwrap().is_empty());
}

#[test]
async fn test_register_rejects_short_password() {
    let (state, _) = state_with(seeded_repo());
    let payload = CredentialsRequest {
        username: "valid_name".into(),
        password: "short".into(),
    };
    let result = handlers::register(State(state), CookieJar::new(), Json(payload)).await;
    assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_login_unknown_user_is_401() {
    let (state, _) = state_with(seeded_repo());
    let payload = CredentialsRequest {
        username: "nobody".into(),
        password: "whatever-password".into(),
    };
    let result = handlers::login(State(state), CookieJar::new(), Json(payload)).await;
    assert_eq!(status_of(result), StatusCode::UNAUTHORIZED);
}

#[test]
async fn test_login_pays_bcrypt_cost_for_unknown_and_known_users() {
    // Cost 8 makes one verify take milliseconds; a lookup miss alone takes microseconds.
    const COST: u32 = 8;
    let mut known = user_row(&author());
    known.password_hash = password::hash_password("right-password".into(), COST)
        .await
        .unwrap();
    let repo = Arc::new(MockRepoControl {
        users: vec![known.clone()],
        ..MockRepoControl::default()
    });
    let mut config = AppConfig::default();
    config.password_cost = COST;
    let tokens = TokenCodec::from_base64_secret(&config.jwt_secret, config.token_ttl).unwrap();
    let state = AppState::new(repo, config, tokens);
    password::dummy_hash(COST).await.unwrap();

    for username in ["nobody", known.username.as_str()] {
        let payload = CredentialsRequest {
            username: username.into(),
            password: "wrong-password".into(),
        };
        let started = Instant::now();
        let result = handlers::login(State(state.clone()), CookieJar::new(), Json(payload)).await;
        let elapsed = started.elapsed();

        assert_eq!(status_of(result), StatusCode::UNAUTHORIZED);
        assert!(
            elapsed >= Duration::from_millis(5),
            "login for {username} skipped password verification ({elapsed:?})"
        );
    }
}

#[test]
async fn test_admin_cannot_ban_self() {
    let (state, repo) = state_with(seeded_repo());
    let result = handlers::ban_user(AuthUser(admin()), State(state), Path(ADMIN_ID)).await;
    assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
    assert!(repo.writes.lock().unwrap().is_empty());
}

#[test]
async fn test_admin_bans_user() {
    let (state, repo) = state_with(seeded_repo());
    let status = handlers::ban_user(AuthUser(admin()), State(state), Path(STRANGER_ID))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        *repo.writes.lock().unwrap(),
        vec!["set_user_banned:true".to_string()]
    );
}

#[test]
async fn test_get_admin_stats_returns_repository_counts() {
    let stats = AdminDashboardStats {
        total_users: 3,
        hidden_posts: 1,
        ..AdminDashboardStats::default()
    };
    let (state, _) = state_with(MockRepoControl {
        stats_to_return: stats.clone(),
        ..seeded_repo()
    });
    let Json(body) = handlers::get_admin_stats(State(state)).await.unwrap();
    assert_eq!(body, stats);
}
