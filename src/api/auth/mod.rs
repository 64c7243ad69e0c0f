//! Authentication: Basic credentials for the JSON API, cookie sessions for
//! the browser login flow.
//!
//! Both paths end in an [`Identity`] stored in the request extensions.

pub mod basic;
pub mod password;
pub mod session;

use crate::{
    model::{ObjectId, User},
    store::{Store, StoreError},
};
use secrecy::SecretString;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: i64,
    session_cookie_secure: bool,
    login_path: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie_secure: false,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: String) -> Self {
        self.login_path = path;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }

    /// Where unauthenticated browser requests are redirected.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The authenticated caller of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: ObjectId,
    pub email: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email {0} not found.")]
    UnknownEmail(String),
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("password check failed: {0}")]
    Hash(#[source] anyhow::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Look up `email` and check `password` against the stored hash.
///
/// `email` must already be normalized.
pub async fn authenticate(
    store: &dyn Store,
    email: &str,
    password: SecretString,
) -> Result<User, AuthError> {
    let Some(user) = store.find_user_by_email(email).await? else {
        return Err(AuthError::UnknownEmail(email.to_string()));
    };

    if password::verify(password, user.password.clone())
        .await
        .map_err(AuthError::Hash)?
    {
        Ok(user)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}
