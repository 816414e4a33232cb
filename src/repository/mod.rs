use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AdminDashboardStats, Comment, CreatePostRequest, Post, Role, UpdatePostRequest, User,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Persistence failures. `Conflict` is the only one a client can cause.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Input for account creation. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Repository Trait
///
/// The persistence collaborator. Lookups return rows exactly as stored,
/// hidden ones included: deciding who may see them is the visibility policy's
/// job, never the query's.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    // Duplicate usernames yield `RepositoryError::Conflict`.
    async fn create_user(&self, new_user: NewUser) -> RepoResult<User>;
    async fn set_user_banned(&self, id: Uuid, banned: bool) -> RepoResult<Option<User>>;

    // --- Posts ---
    // Newest first.
    async fn list_posts(&self) -> RepoResult<Vec<Post>>;
    async fn list_posts_by_authors(&self, author_ids: &[Uuid]) -> RepoResult<Vec<Post>>;
    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>>;
    async fn create_post(&self, author_id: Uuid, req: CreatePostRequest) -> RepoResult<Post>;
    // Partial update; `None` fields are left untouched.
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> RepoResult<Option<Post>>;
    async fn delete_post(&self, id: Uuid) -> RepoResult<bool>;
    async fn set_post_hidden(&self, id: Uuid, hidden: bool) -> RepoResult<Option<Post>>;

    // --- Comments ---
    // Oldest first.
    async fn list_comments(&self, post_id: Uuid) -> RepoResult<Vec<Comment>>;
    async fn find_comment(&self, id: Uuid) -> RepoResult<Option<Comment>>;
    async fn create_comment(&self, post_id: Uuid, author_id: Uuid, body: String)
    -> RepoResult<Comment>;
    async fn update_comment(&self, id: Uuid, body: String) -> RepoResult<Option<Comment>>;
    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool>;
    async fn set_comment_hidden(&self, id: Uuid, hidden: bool) -> RepoResult<Option<Comment>>;

    // --- Likes ---
    /// Adds the like if absent, removes it if present. Returns whether the
    /// user likes the post afterwards.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> RepoResult<bool>;
    async fn count_likes(&self, post_id: Uuid) -> RepoResult<i64>;

    // --- Subscriptions ---
    // Both return whether a row changed.
    async fn subscribe(&self, subscriber_id: Uuid, author_id: Uuid) -> RepoResult<bool>;
    async fn unsubscribe(&self, subscriber_id: Uuid, author_id: Uuid) -> RepoResult<bool>;
    async fn list_subscriptions(&self, subscriber_id: Uuid) -> RepoResult<Vec<Uuid>>;

    // --- Moderation ---
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
