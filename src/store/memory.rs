//! In-process backend used by tests and `--store memory`.

use super::{SessionRecord, Store, StoreError, StoreResult};
use crate::model::{ObjectId, Post, PostFilter, PostPatch, User};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicUsize, Ordering},
};
use tokio::sync::RwLock;

/// Maps behind async locks, plus a counter of every store call.
///
/// `BTreeMap` keyed by [`ObjectId`] keeps posts in creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<ObjectId, User>>,
    posts: RwLock<BTreeMap<ObjectId, Post>>,
    sessions: RwLock<HashMap<Vec<u8>, SessionRecord>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.record_call();
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.record_call();
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: ObjectId) -> StoreResult<Option<User>> {
        self.record_call();
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.record_call();
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        if users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("_id {}", user.id)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        self.record_call();
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn remove_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.record_call();
        let mut users = self.users.write().await;
        let Some(id) = users
            .values()
            .find(|user| user.email == email)
            .map(|user| user.id)
        else {
            return Ok(None);
        };
        let removed = users.remove(&id);
        drop(users);

        // Sessions of a deleted account are useless; drop them with it.
        self.sessions
            .write()
            .await
            .retain(|_, session| session.user_id != id);
        Ok(removed)
    }

    async fn find_post(&self, id: ObjectId) -> StoreResult<Option<Post>> {
        self.record_call();
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn find_posts(&self, filter: &PostFilter) -> StoreResult<Vec<Post>> {
        self.record_call();
        let posts = self.posts.read().await;
        Ok(posts
            .values()
            .filter(|post| filter.matches(post))
            .cloned()
            .collect())
    }

    async fn find_duplicate_post(
        &self,
        user_id: ObjectId,
        title: &str,
        text: &str,
    ) -> StoreResult<Option<Post>> {
        self.record_call();
        let posts = self.posts.read().await;
        Ok(posts
            .values()
            .find(|post| post.user_id == user_id && post.title == title && post.text == text)
            .cloned())
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        self.record_call();
        let mut posts = self.posts.write().await;
        if posts.contains_key(&post.id) {
            return Err(StoreError::Duplicate(format!("_id {}", post.id)));
        }
        posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn save_post(&self, post: &Post) -> StoreResult<()> {
        self.record_call();
        self.posts.write().await.insert(post.id, post.clone());
        Ok(())
    }

    async fn update_post(&self, id: ObjectId, patch: PostPatch) -> StoreResult<Option<Post>> {
        self.record_call();
        let mut posts = self.posts.write().await;
        let Some(current) = posts.remove(&id) else {
            return Ok(None);
        };
        let updated = current.apply(patch, Utc::now());
        posts.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn remove_post(&self, id: ObjectId) -> StoreResult<Option<Post>> {
        self.record_call();
        Ok(self.posts.write().await.remove(&id))
    }

    async fn insert_session(&self, session: &SessionRecord) -> StoreResult<()> {
        self.record_call();
        self.sessions
            .write()
            .await
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token_hash: &[u8]) -> StoreResult<Option<SessionRecord>> {
        self.record_call();
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(token_hash)
            .filter(|session| session.expires_at > Utc::now())
            .cloned())
    }

    async fn remove_session(&self, token_hash: &[u8]) -> StoreResult<()> {
        self.record_call();
        self.sessions.write().await.remove(token_hash);
        Ok(())
    }
}
