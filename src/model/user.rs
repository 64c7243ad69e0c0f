//! Stored user accounts and the pure merge applied by `PUT /api/users`.

use super::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Profile {
    /// Shallow merge: fields present in `patch` win, the rest are kept.
    #[must_use]
    pub fn merge(self, patch: Self) -> Self {
        Self {
            name: patch.name.or(self.name),
            gender: patch.gender.or(self.gender),
            location: patch.location.or(self.location),
        }
    }
}

/// External provider token attached to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub access_token: String,
    pub kind: String,
}

/// Persisted account document.
///
/// `password` is an argon2 PHC string; it never leaves the service, see
/// [`UserView`] for the public shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tokens: Vec<AuthToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// `email` must already be normalized, `password_hash` already hashed.
    #[must_use]
    pub fn new(email: String, password_hash: String, profile: Profile, now: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::new(),
            email,
            password: password_hash,
            profile,
            groups: Vec::new(),
            password_reset_token: None,
            password_reset_expires: None,
            tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update. Pure: no I/O, no hashing.
    #[must_use]
    pub fn apply(self, patch: UserPatch, now: DateTime<Utc>) -> Self {
        Self {
            password: patch.password_hash.unwrap_or(self.password),
            profile: self.profile.merge(patch.profile),
            updated_at: now,
            ..self
        }
    }
}

/// Fields an update may overwrite. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub password_hash: Option<String>,
    pub profile: Profile,
}

/// User record as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "_id")]
    #[schema(value_type = String, example = "5a266bd64765b940ec7e8765")]
    pub id: ObjectId,
    pub email: String,
    pub profile: Profile,
    pub groups: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            profile: user.profile.clone(),
            groups: user.groups.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
