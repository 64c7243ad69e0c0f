//! Postgres backend: each entity is a JSONB document, with the columns used
//! for lookups duplicated next to it.

use super::{SessionRecord, Store, StoreError, StoreResult};
use crate::model::{ObjectId, Post, PostFilter, PostPatch, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    types::Json,
    PgPool, Row,
};
use std::time::Duration;
use tracing::{info_span, Instrument, Span};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a small pool to `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await?;
        Ok(Self { pool })
    }

    /// Create tables and indexes if they are missing.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in split_sql_statements(SCHEMA_SQL) {
            sqlx::query(statement.as_str())
                .execute(&self.pool)
                .instrument(db_span("MIGRATE", "schema.sql"))
                .await?;
        }
        Ok(())
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn insert_error(err: sqlx::Error, key: String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(key),
        _ => StoreError::Database(err),
    }
}

fn user_doc(row: &PgRow) -> StoreResult<User> {
    Ok(row.try_get::<Json<User>, _>("doc")?.0)
}

fn post_doc(row: &PgRow) -> StoreResult<Post> {
    Ok(row.try_get::<Json<Post>, _>("doc")?.0)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        let query = "SELECT 1";
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = "SELECT doc FROM users WHERE email = $1";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        row.as_ref().map(user_doc).transpose()
    }

    async fn find_user_by_id(&self, id: ObjectId) -> StoreResult<Option<User>> {
        let query = "SELECT doc FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id.to_hex())
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        row.as_ref().map(user_doc).transpose()
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let query = "INSERT INTO users (id, email, doc) VALUES ($1, $2, $3)";
        sqlx::query(query)
            .bind(user.id.to_hex())
            .bind(&user.email)
            .bind(Json(user))
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(|err| insert_error(err, format!("email {}", user.email)))?;
        Ok(())
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let query = "UPDATE users SET email = $2, doc = $3 WHERE id = $1";
        sqlx::query(query)
            .bind(user.id.to_hex())
            .bind(&user.email)
            .bind(Json(user))
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;
        Ok(())
    }

    async fn remove_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        // Sessions go with the user through ON DELETE CASCADE.
        let query = "DELETE FROM users WHERE email = $1 RETURNING doc";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        row.as_ref().map(user_doc).transpose()
    }

    async fn find_post(&self, id: ObjectId) -> StoreResult<Option<Post>> {
        let query = "SELECT doc FROM posts WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id.to_hex())
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        row.as_ref().map(post_doc).transpose()
    }

    async fn find_posts(&self, filter: &PostFilter) -> StoreResult<Vec<Post>> {
        // Hex ids start with the creation second, so ordering by id is creation order.
        // The title pattern uses Rust regex syntax and is applied after the fetch.
        let query = "SELECT doc FROM posts \
                     WHERE ($1::text IS NULL OR user_id = $1) \
                       AND ($2::text IS NULL OR doc -> 'tags' ? $2) \
                     ORDER BY id";
        let rows = sqlx::query(query)
            .bind(filter.user_id.map(|id| id.to_hex()))
            .bind(filter.tag.as_deref())
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in &rows {
            let post = post_doc(row)?;
            if filter.matches(&post) {
                posts.push(post);
            }
        }
        Ok(posts)
    }

    async fn find_duplicate_post(
        &self,
        user_id: ObjectId,
        title: &str,
        text: &str,
    ) -> StoreResult<Option<Post>> {
        let query = "SELECT doc FROM posts \
                     WHERE user_id = $1 AND doc ->> 'title' = $2 AND doc ->> 'text' = $3 \
                     LIMIT 1";
        let row = sqlx::query(query)
            .bind(user_id.to_hex())
            .bind(title)
            .bind(text)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        row.as_ref().map(post_doc).transpose()
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        let query = "INSERT INTO posts (id, user_id, doc) VALUES ($1, $2, $3)";
        sqlx::query(query)
            .bind(post.id.to_hex())
            .bind(post.user_id.to_hex())
            .bind(Json(post))
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(|err| insert_error(err, format!("_id {}", post.id)))?;
        Ok(())
    }

    async fn save_post(&self, post: &Post) -> StoreResult<()> {
        let query = "UPDATE posts SET user_id = $2, doc = $3 WHERE id = $1";
        sqlx::query(query)
            .bind(post.id.to_hex())
            .bind(post.user_id.to_hex())
            .bind(Json(post))
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;
        Ok(())
    }

    async fn update_post(&self, id: ObjectId, patch: PostPatch) -> StoreResult<Option<Post>> {
        let mut tx = self.pool.begin().await?;

        let select = "SELECT doc FROM posts WHERE id = $1 FOR UPDATE";
        let row = sqlx::query(select)
            .bind(id.to_hex())
            .fetch_optional(&mut *tx)
            .instrument(db_span("SELECT", select))
            .await?;
        let Some(current) = row.as_ref().map(post_doc).transpose()? else {
            return Ok(None);
        };

        let updated = current.apply(patch, Utc::now());
        let update = "UPDATE posts SET user_id = $2, doc = $3 WHERE id = $1";
        sqlx::query(update)
            .bind(id.to_hex())
            .bind(updated.user_id.to_hex())
            .bind(Json(&updated))
            .execute(&mut *tx)
            .instrument(db_span("UPDATE", update))
            .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn remove_post(&self, id: ObjectId) -> StoreResult<Option<Post>> {
        let query = "DELETE FROM posts WHERE id = $1 RETURNING doc";
        let row = sqlx::query(query)
            .bind(id.to_hex())
            .fetch_optional(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        row.as_ref().map(post_doc).transpose()
    }

    async fn insert_session(&self, session: &SessionRecord) -> StoreResult<()> {
        let query =
            "INSERT INTO user_sessions (session_hash, user_id, expires_at) VALUES ($1, $2, $3)";
        sqlx::query(query)
            .bind(&session.token_hash)
            .bind(session.user_id.to_hex())
            .bind(session.expires_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(|err| insert_error(err, "session_hash".to_string()))?;
        Ok(())
    }

    async fn find_session(&self, token_hash: &[u8]) -> StoreResult<Option<SessionRecord>> {
        let query = "SELECT session_hash, user_id, expires_at FROM user_sessions \
                     WHERE session_hash = $1 AND expires_at > NOW()";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let user_id: String = row.try_get("user_id")?;
        let user_id = user_id.parse::<ObjectId>().map_err(|err| {
            StoreError::Database(sqlx::Error::Decode(Box::new(err)))
        })?;
        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        Ok(Some(SessionRecord {
            token_hash: row.try_get("session_hash")?,
            user_id,
            expires_at,
        }))
    }

    async fn remove_session(&self, token_hash: &[u8]) -> StoreResult<()> {
        let query = "DELETE FROM user_sessions WHERE session_hash = $1";
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(())
    }
}
