//! Account endpoints under `/api/users`.
//!
//! Creation is public; lookup, upsert and removal need Basic credentials.

use super::{normalize_email, valid_email, MIN_PASSWORD_LENGTH};
use crate::{
    api::{
        auth::{password, Identity},
        error::ApiError,
    },
    model::{Profile, User, UserPatch, UserView},
    store::SharedStore,
};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

pub const ACCOUNT_EXISTS: &str = "Account with that email address already exists.";

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    #[schema(value_type = String, format = Password)]
    password: SecretString,
    #[serde(default)]
    #[schema(value_type = String, format = Password)]
    confirm_password: SecretString,
    #[serde(default)]
    profile: Option<Profile>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailQuery {
    /// Account email; matched case-insensitively.
    email: Option<String>,
}

/// A [`UserRequest`] that passed validation.
struct ValidUser {
    email: String,
    password: SecretString,
    profile: Profile,
}

fn validate(request: UserRequest) -> Result<ValidUser, ApiError> {
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("Email is not valid".to_string()));
    }
    let password = request.password.expose_secret();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    if password != request.confirm_password.expose_secret() {
        return Err(ApiError::Validation("Passwords do not match".to_string()));
    }
    Ok(ValidUser {
        email,
        password: request.password,
        profile: request.profile.unwrap_or_default(),
    })
}

fn email_param(query: EmailQuery) -> Result<String, ApiError> {
    query
        .email
        .map(|email| normalize_email(&email))
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing email".to_string()))
}

async fn hash(password: SecretString) -> Result<String, ApiError> {
    password::hash(password).await.map_err(ApiError::internal)
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Invalid input or email already registered", body = String),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn create(
    store: Extension<SharedStore>,
    payload: Option<Json<UserRequest>>,
) -> Result<StatusCode, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };
    let valid = validate(request)?;

    if store.find_user_by_email(&valid.email).await?.is_some() {
        return Err(ApiError::Conflict(ACCOUNT_EXISTS.to_string()));
    }

    let user = User::new(valid.email, hash(valid.password).await?, valid.profile, Utc::now());
    store.insert_user(&user).await?;

    info!(user_id = %user.id, "account created");

    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    put,
    path = "/api/users",
    request_body = UserRequest,
    responses(
        (status = 200, description = "Existing account updated", body = String),
        (status = 201, description = "Account created", body = String),
        (status = 400, description = "Invalid input", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
    ),
    security(("basic" = [])),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn update(
    Extension(identity): Extension<Identity>,
    store: Extension<SharedStore>,
    payload: Option<Json<UserRequest>>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };
    let valid = validate(request)?;

    let Some(existing) = store.find_user_by_email(&valid.email).await? else {
        let user = User::new(valid.email, hash(valid.password).await?, valid.profile, Utc::now());
        store.insert_user(&user).await?;
        info!(caller = %identity.user_id, user_id = %user.id, "account created by upsert");
        return Ok((StatusCode::CREATED, "created"));
    };

    let patch = UserPatch {
        password_hash: Some(hash(valid.password).await?),
        profile: valid.profile,
    };
    let updated = existing.apply(patch, Utc::now());
    store.save_user(&updated).await?;

    info!(caller = %identity.user_id, user_id = %updated.id, "account updated");

    Ok((StatusCode::OK, "updated"))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(EmailQuery),
    responses(
        (status = 200, description = "Account found", body = UserView),
        (status = 400, description = "Missing email", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
        (status = 404, description = "No account with that email", body = String),
    ),
    security(("basic" = [])),
    tag = "users"
)]
pub async fn find_by_email(
    store: Extension<SharedStore>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<UserView>, ApiError> {
    let email = email_param(query)?;
    match store.find_user_by_email(&email).await? {
        Some(user) => Ok(Json(UserView::from(&user))),
        None => Err(ApiError::NotFound(format!("Email {email} not found."))),
    }
}

#[utoipa::path(
    delete,
    path = "/api/users",
    params(EmailQuery),
    responses(
        (status = 200, description = "Account removed"),
        (status = 400, description = "Missing email", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
        (status = 404, description = "No account with that email", body = String),
    ),
    security(("basic" = [])),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn delete_by_email(
    Extension(identity): Extension<Identity>,
    store: Extension<SharedStore>,
    Query(query): Query<EmailQuery>,
) -> Result<StatusCode, ApiError> {
    let email = email_param(query)?;
    match store.remove_user_by_email(&email).await? {
        Some(user) => {
            info!(caller = %identity.user_id, user_id = %user.id, "account removed");
            Ok(StatusCode::OK)
        }
        None => Err(ApiError::NotFound(format!("Email {email} not found."))),
    }
}
