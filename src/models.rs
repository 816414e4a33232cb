use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// Privilege level of an account. `Admin` is the only elevated role and is
/// exempt from hidden-content restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Parses the stored column value. Anything unrecognised is treated as the
    /// unprivileged role.
    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("ADMIN") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// User
///
/// Canonical account record from the `users` table. The password hash never
/// leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    // Stored as text ('USER' | 'ADMIN'); see `Role::from_db`.
    pub role: String,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from_db(&self.role)
    }
}

/// Post
///
/// A blog post row joined with its author's username. `hidden` is the
/// moderation flag read by the visibility policy.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    #[sqlx(default)]
    pub author_username: Option<String>,
    pub title: String,
    pub body: String,
    pub hidden: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment on a post. Moderated independently of its parent post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    #[sqlx(default)]
    pub author_username: Option<String>,
    pub body: String,
    pub hidden: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CredentialsRequest
///
/// Body of both `POST /auth/register` and `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CredentialsRequest {
    #[schema(example = "ada_l")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
}

/// UpdatePostRequest
///
/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentRequest {
    pub body: String,
}

// --- Output Schemas ---

/// UserProfile
///
/// Public projection of an account (GET /me, register, login).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role(),
        }
    }
}

/// LikeResponse
///
/// Result of toggling a like: whether the caller now likes the post, and the new total.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct SubscriptionResponse {
    pub author_id: Uuid,
    pub subscribed: bool,
}

/// AdminDashboardStats
///
/// Output schema for the moderation dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub banned_users: i64,
    pub total_posts: i64,
    pub hidden_posts: i64,
    pub total_comments: i64,
    pub hidden_comments: i64,
}
