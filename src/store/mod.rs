//! Persistence seam for handlers.
//!
//! Every handler performs exactly one logical operation through [`Store`].
//! There is no transaction spanning a read and the following write, so
//! uniqueness checks done by handlers (email, duplicate post) are best effort;
//! the Postgres backend backs the email check with a unique index.

use crate::model::{ObjectId, Post, PostFilter, PostPatch, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A login session: only the owner's id is remembered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// SHA-256 of the cookie token; raw tokens are never stored.
    pub token_hash: Vec<u8>,
    pub user_id: ObjectId,
    pub expires_at: DateTime<Utc>,
}

/// Document store consumed by the HTTP handlers.
///
/// Emails passed in must already be normalized (trimmed, lowercased).
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe used by `/health`.
    async fn ping(&self) -> StoreResult<()>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&self, id: ObjectId) -> StoreResult<Option<User>>;

    /// Insert a new account; fails with [`StoreError::Duplicate`] on email clash.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Overwrite an existing account document.
    async fn save_user(&self, user: &User) -> StoreResult<()>;

    /// Find-and-remove by email, returning the removed record.
    async fn remove_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_post(&self, id: ObjectId) -> StoreResult<Option<Post>>;

    /// Posts matching `filter`, oldest first.
    async fn find_posts(&self, filter: &PostFilter) -> StoreResult<Vec<Post>>;

    /// A post with exactly this (author, title, text) triple, if any.
    async fn find_duplicate_post(
        &self,
        user_id: ObjectId,
        title: &str,
        text: &str,
    ) -> StoreResult<Option<Post>>;

    async fn insert_post(&self, post: &Post) -> StoreResult<()>;

    /// Overwrite a whole post document, comments included.
    async fn save_post(&self, post: &Post) -> StoreResult<()>;

    /// Find-and-update: apply `patch` and return the updated post.
    async fn update_post(&self, id: ObjectId, patch: PostPatch) -> StoreResult<Option<Post>>;

    /// Find-and-remove, returning the removed post.
    async fn remove_post(&self, id: ObjectId) -> StoreResult<Option<Post>>;

    async fn insert_session(&self, session: &SessionRecord) -> StoreResult<()>;

    /// Unexpired session for this token hash.
    async fn find_session(&self, token_hash: &[u8]) -> StoreResult<Option<SessionRecord>>;

    async fn remove_session(&self, token_hash: &[u8]) -> StoreResult<()>;
}

/// Handle shared by every request.
pub type SharedStore = Arc<dyn Store>;
