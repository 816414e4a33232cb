use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewUser, RepoResult, Repository, RepositoryError};
use crate::models::{AdminDashboardStats, Comment, CreatePostRequest, Post, UpdatePostRequest, User};

// Column lists shared by every post/comment query so the FromRow mapping
// stays in one place. Both expect the row alias `r` and the author alias `u`.
const POST_COLUMNS: &str = "r.id, r.author_id, u.username AS author_username, r.title, r.body, \
                            r.hidden, r.created_at, r.updated_at";
const COMMENT_COLUMNS: &str = "r.id, r.post_id, r.author_id, u.username AS author_username, \
                               r.body, r.hidden, r.created_at, r.updated_at";
const USER_COLUMNS: &str = "id, username, password_hash, role, banned, created_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Schema lives in
/// `migrations/` and is applied at boot.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique-constraint violation onto `RepositoryError::Conflict`.
fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(format!("{what} already exists"))
        }
        _ => RepositoryError::Database(err),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- ACCOUNTS ---

    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, new_user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, password_hash, role) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.username)
            .bind(&new_user.password_hash)
            .bind(new_user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "username"))
    }

    async fn set_user_banned(&self, id: Uuid, banned: bool) -> RepoResult<Option<User>> {
        let sql = format!("UPDATE users SET banned = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(banned)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- POSTS ---

    async fn list_posts(&self) -> RepoResult<Vec<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts r JOIN users u ON u.id = r.author_id \
             ORDER BY r.created_at DESC, r.id"
        );
        Ok(sqlx::query_as::<_, Post>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_posts_by_authors(&self, author_ids: &[Uuid]) -> RepoResult<Vec<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts r JOIN users u ON u.id = r.author_id \
             WHERE r.author_id = ANY($1) ORDER BY r.created_at DESC, r.id"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(author_ids.to_vec())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts r JOIN users u ON u.id = r.author_id WHERE r.id = $1"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// create_post
    ///
    /// Inserts and joins the author's username in one statement via a CTE.
    async fn create_post(&self, author_id: Uuid, req: CreatePostRequest) -> RepoResult<Post> {
        let sql = format!(
            "WITH r AS ( \
                INSERT INTO posts (id, author_id, title, body) VALUES ($1, $2, $3, $4) RETURNING * \
             ) SELECT {POST_COLUMNS} FROM r JOIN users u ON u.id = r.author_id"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(Uuid::new_v4())
            .bind(author_id)
            .bind(req.title)
            .bind(req.body)
            .fetch_one(&self.pool)
            .await?)
    }

    /// update_post
    ///
    /// `COALESCE` keeps the stored value for every field the request omits.
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> RepoResult<Option<Post>> {
        let sql = format!(
            "WITH r AS ( \
                UPDATE posts SET title = COALESCE($2, title), body = COALESCE($3, body), \
                       updated_at = NOW() \
                WHERE id = $1 RETURNING * \
             ) SELECT {POST_COLUMNS} FROM r JOIN users u ON u.id = r.author_id"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(req.title)
            .bind(req.body)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_post_hidden(&self, id: Uuid, hidden: bool) -> RepoResult<Option<Post>> {
        let sql = format!(
            "WITH r AS ( \
                UPDATE posts SET hidden = $2 WHERE id = $1 RETURNING * \
             ) SELECT {POST_COLUMNS} FROM r JOIN users u ON u.id = r.author_id"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(hidden)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- COMMENTS ---

    async fn list_comments(&self, post_id: Uuid) -> RepoResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments r JOIN users u ON u.id = r.author_id \
             WHERE r.post_id = $1 ORDER BY r.created_at ASC, r.id"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_comment(&self, id: Uuid) -> RepoResult<Option<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments r JOIN users u ON u.id = r.author_id \
             WHERE r.id = $1"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        body: String,
    ) -> RepoResult<Comment> {
        let sql = format!(
            "WITH r AS ( \
                INSERT INTO comments (id, post_id, author_id, body) VALUES ($1, $2, $3, $4) \
                RETURNING * \
             ) SELECT {COMMENT_COLUMNS} FROM r JOIN users u ON u.id = r.author_id"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(Uuid::new_v4())
            .bind(post_id)
            .bind(author_id)
            .bind(body)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_comment(&self, id: Uuid, body: String) -> RepoResult<Option<Comment>> {
        let sql = format!(
            "WITH r AS ( \
                UPDATE comments SET body = $2, updated_at = NOW() WHERE id = $1 RETURNING * \
             ) SELECT {COMMENT_COLUMNS} FROM r JOIN users u ON u.id = r.author_id"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(body)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_comment_hidden(&self, id: Uuid, hidden: bool) -> RepoResult<Option<Comment>> {
        let sql = format!(
            "WITH r AS ( \
                UPDATE comments SET hidden = $2 WHERE id = $1 RETURNING * \
             ) SELECT {COMMENT_COLUMNS} FROM r JOIN users u ON u.id = r.author_id"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(hidden)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- LIKES ---

    /// toggle_like
    ///
    /// Delete-or-insert in one statement: the insert only runs when the delete
    /// removed nothing. A returned row means the like now exists.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let inserted = sqlx::query_scalar::<_, i32>(
            r#"
            WITH removed AS (
                DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2 RETURNING 1
            )
            INSERT INTO post_likes (post_id, user_id)
            SELECT $1, $2 WHERE NOT EXISTS (SELECT 1 FROM removed)
            ON CONFLICT DO NOTHING
            RETURNING 1
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted.is_some())
    }

    async fn count_likes(&self, post_id: Uuid) -> RepoResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    // --- SUBSCRIPTIONS ---

    async fn subscribe(&self, subscriber_id: Uuid, author_id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query(
            "INSERT INTO subscriptions (subscriber_id, author_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(subscriber_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn unsubscribe(&self, subscriber_id: Uuid, author_id: Uuid) -> RepoResult<bool> {
        let res =
            sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2")
                .bind(subscriber_id)
                .bind(author_id)
                .execute(&self.pool)
                .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_subscriptions(&self, subscriber_id: Uuid) -> RepoResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT author_id FROM subscriptions WHERE subscriber_id = $1 ORDER BY created_at",
        )
        .bind(subscriber_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // --- MODERATION ---

    /// get_stats
    ///
    /// Compiles every dashboard counter in a single round trip.
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let (total_users, banned_users, total_posts, hidden_posts, total_comments, hidden_comments) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM users WHERE banned),
                    (SELECT COUNT(*) FROM posts),
                    (SELECT COUNT(*) FROM posts WHERE hidden),
                    (SELECT COUNT(*) FROM comments),
                    (SELECT COUNT(*) FROM comments WHERE hidden)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(AdminDashboardStats {
            total_users,
            banned_users,
            total_posts,
            hidden_posts,
            total_comments,
            hidden_comments,
        })
    }
}
