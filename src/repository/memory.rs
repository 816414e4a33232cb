use std::{
    collections::{HashMap, HashSet},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{NewUser, RepoResult, Repository, RepositoryError};
use crate::models::{AdminDashboardStats, Comment, CreatePostRequest, Post, UpdatePostRequest, User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    // Insertion order doubles as creation order, which keeps listings stable
    // when two rows share a timestamp.
    posts: Vec<Post>,
    comments: Vec<Comment>,
    likes: HashSet<(Uuid, Uuid)>,
    // (subscriber, author) in subscription order.
    subscriptions: Vec<(Uuid, Uuid)>,
}

impl Inner {
    fn username_of(&self, id: Uuid) -> Option<String> {
        self.users.get(&id).map(|u| u.username.clone())
    }

    // Rows carry a snapshot of the author's name, refreshed on every read so a
    // lookup matches what the Postgres join would produce.
    fn with_author_post(&self, mut post: Post) -> Post {
        post.author_username = self.username_of(post.author_id);
        post
    }

    fn with_author_comment(&self, mut comment: Comment) -> Comment {
        comment.author_username = self.username_of(comment.author_id);
        comment
    }
}

/// InMemoryRepository
///
/// A process-local `Repository` used by the test suite and by local runs
/// without a database. Semantics follow the Postgres schema: unique
/// usernames, cascading deletes from posts to their comments and likes, and
/// at most one like per (post, user).
#[derive(Default)]
pub struct InMemoryRepository {
    inner: RwLock<Inner>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(self
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> RepoResult<User> {
        let mut inner = self.write();
        if inner.users.values().any(|u| u.username == new_user.username) {
            return Err(RepositoryError::Conflict("username already exists".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            password_hash: new_user.password_hash,
            role: new_user.role.as_str().to_string(),
            banned: false,
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_user_banned(&self, id: Uuid, banned: bool) -> RepoResult<Option<User>> {
        let mut inner = self.write();
        Ok(inner.users.get_mut(&id).map(|user| {
            user.banned = banned;
            user.clone()
        }))
    }

    async fn list_posts(&self) -> RepoResult<Vec<Post>> {
        let inner = self.read();
        Ok(inner
            .posts
            .iter()
            .rev()
            .map(|p| inner.with_author_post(p.clone()))
            .collect())
    }

    async fn list_posts_by_authors(&self, author_ids: &[Uuid]) -> RepoResult<Vec<Post>> {
        let inner = self.read();
        Ok(inner
            .posts
            .iter()
            .rev()
            .filter(|p| author_ids.contains(&p.author_id))
            .map(|p| inner.with_author_post(p.clone()))
            .collect())
    }

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        let inner = self.read();
        Ok(inner
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| inner.with_author_post(p.clone())))
    }

    async fn create_post(&self, author_id: Uuid, req: CreatePostRequest) -> RepoResult<Post> {
        let mut inner = self.write();
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            author_id,
            author_username: None,
            title: req.title,
            body: req.body,
            hidden: false,
            created_at: now,
            updated_at: now,
        };
        inner.posts.push(post.clone());
        Ok(inner.with_author_post(post))
    }

    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> RepoResult<Option<Post>> {
        let mut inner = self.write();
        let Some(post) = inner.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            post.title = title;
        }
        if let Some(body) = req.body {
            post.body = body;
        }
        post.updated_at = Utc::now();
        let post = post.clone();
        Ok(Some(inner.with_author_post(post)))
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        let mut inner = self.write();
        let before = inner.posts.len();
        inner.posts.retain(|p| p.id != id);
        if inner.posts.len() == before {
            return Ok(false);
        }
        inner.comments.retain(|c| c.post_id != id);
        inner.likes.retain(|(post_id, _)| *post_id != id);
        Ok(true)
    }

    async fn set_post_hidden(&self, id: Uuid, hidden: bool) -> RepoResult<Option<Post>> {
        let mut inner = self.write();
        let Some(post) = inner.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.hidden = hidden;
        let post = post.clone();
        Ok(Some(inner.with_author_post(post)))
    }

    async fn list_comments(&self, post_id: Uuid) -> RepoResult<Vec<Comment>> {
        let inner = self.read();
        Ok(inner
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| inner.with_author_comment(c.clone()))
            .collect())
    }

    async fn find_comment(&self, id: Uuid) -> RepoResult<Option<Comment>> {
        let inner = self.read();
        Ok(inner
            .comments
            .iter()
            .find(|c| c.id == id)
            .map(|c| inner.with_author_comment(c.clone())))
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        body: String,
    ) -> RepoResult<Comment> {
        let mut inner = self.write();
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            author_username: None,
            body,
            hidden: false,
            created_at: now,
            updated_at: now,
        };
        inner.comments.push(comment.clone());
        Ok(inner.with_author_comment(comment))
    }

    async fn update_comment(&self, id: Uuid, body: String) -> RepoResult<Option<Comment>> {
        let mut inner = self.write();
        let Some(comment) = inner.comments.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        comment.body = body;
        comment.updated_at = Utc::now();
        let comment = comment.clone();
        Ok(Some(inner.with_author_comment(comment)))
    }

    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        let mut inner = self.write();
        let before = inner.comments.len();
        inner.comments.retain(|c| c.id != id);
        Ok(inner.comments.len() != before)
    }

    async fn set_comment_hidden(&self, id: Uuid, hidden: bool) -> RepoResult<Option<Comment>> {
        let mut inner = self.write();
        let Some(comment) = inner.comments.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        comment.hidden = hidden;
        let comment = comment.clone();
        Ok(Some(inner.with_author_comment(comment)))
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut inner = self.write();
        let key = (post_id, user_id);
        if inner.likes.remove(&key) {
            Ok(false)
        } else {
            inner.likes.insert(key);
            Ok(true)
        }
    }

    async fn count_likes(&self, post_id: Uuid) -> RepoResult<i64> {
        let count = self
            .read()
            .likes
            .iter()
            .filter(|(post, _)| *post == post_id)
            .count();
        Ok(count as i64)
    }

    async fn subscribe(&self, subscriber_id: Uuid, author_id: Uuid) -> RepoResult<bool> {
        let mut inner = self.write();
        let pair = (subscriber_id, author_id);
        if inner.subscriptions.contains(&pair) {
            return Ok(false);
        }
        inner.subscriptions.push(pair);
        Ok(true)
    }

    async fn unsubscribe(&self, subscriber_id: Uuid, author_id: Uuid) -> RepoResult<bool> {
        let mut inner = self.write();
        let before = inner.subscriptions.len();
        inner
            .subscriptions
            .retain(|pair| *pair != (subscriber_id, author_id));
        Ok(inner.subscriptions.len() != before)
    }

    async fn list_subscriptions(&self, subscriber_id: Uuid) -> RepoResult<Vec<Uuid>> {
        Ok(self
            .read()
            .subscriptions
            .iter()
            .filter(|(subscriber, _)| *subscriber == subscriber_id)
            .map(|(_, author)| *author)
            .collect())
    }

    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let inner = self.read();
        let count = |n: usize| n as i64;
        Ok(AdminDashboardStats {
            total_users: count(inner.users.len()),
            banned_users: count(inner.users.values().filter(|u| u.banned).count()),
            total_posts: count(inner.posts.len()),
            hidden_posts: count(inner.posts.iter().filter(|p| p.hidden).count()),
            total_comments: count(inner.comments.len()),
            hidden_comments: count(inner.comments.iter().filter(|c| c.hidden).count()),
        })
    }
}
