//! # Postline (users, posts and comments over HTTP)
//!
//! `postline` is a small REST backend: account management with password
//! authentication, plus a blog-like post resource whose comments live inside
//! their parent post.
//!
//! ## Authentication
//!
//! Two entry points share the same credential check:
//!
//! - **Session login** (`POST /api/login`): email + password in the body. On
//!   success a session cookie is issued; the session only remembers the user id
//!   and the full record is re-fetched on every request.
//! - **HTTP Basic** (every other `/api/*` route except user creation): stateless,
//!   credentials must be sent with each call.
//!
//! Passwords are stored as argon2id PHC strings. Emails are trimmed and
//! lowercased before any lookup, so uniqueness is case-insensitive.
//!
//! ## Storage
//!
//! Handlers talk to a [`store::Store`]. Two backends ship with the crate: a
//! Postgres backend keeping each entity as a JSONB document, and an in-memory
//! backend used by the test-suite and `--store memory`.
//!
//! Identifiers are 24-character hexadecimal [`model::ObjectId`]s; malformed ids
//! are rejected with `400 Bad Request` before the store is touched.

pub mod api;
pub mod cli;
pub mod model;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
