//! Session login for browser clients.
//!
//! Flow Overview:
//! 1) `POST /api/login` checks email + password and issues a session cookie.
//! 2) Pages behind `require_session` re-load the account from that cookie.
//! 3) `POST /api/logout` drops the session and clears the cookie.

use super::{normalize_email, valid_email};
use crate::{
    api::{
        auth::{authenticate, session, AuthConfig, AuthError},
        error::ApiError,
    },
    model::{User, UserView},
    store::SharedStore,
};
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    #[schema(value_type = String, format = Password)]
    password: SecretString,
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = UserView),
        (status = 400, description = "Missing payload, invalid email or empty password", body = String),
        (status = 404, description = "Unknown email or wrong password", body = String),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    store: Extension<SharedStore>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("Email is not valid".to_string()));
    }
    if request.password.expose_secret().is_empty() {
        return Err(ApiError::Validation("Password cannot be blank".to_string()));
    }

    let user = match authenticate(&**store, &email, request.password).await {
        Ok(user) => user,
        Err(err @ (AuthError::UnknownEmail(_) | AuthError::InvalidCredentials)) => {
            return Err(ApiError::NotFound(err.to_string()));
        }
        Err(AuthError::Store(err)) => return Err(err.into()),
        Err(err) => return Err(ApiError::internal(err)),
    };

    let token = session::start_session(&**store, &config, user.id)
        .await
        .map_err(ApiError::internal)?;
    let cookie = session::session_cookie(&config, &token).map_err(ApiError::internal)?;

    info!(user_id = %user.id, "session started");

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(UserView::from(&user)),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    store: Extension<SharedStore>,
    config: Extension<Arc<AuthConfig>>,
) -> impl IntoResponse {
    if let Err(err) = session::end_session(&**store, &headers).await {
        error!("Failed to delete session: {err}");
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = session::clear_session_cookie(&config) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers)
}

#[utoipa::path(
    get,
    path = "/account",
    responses(
        (status = 200, description = "Account of the logged-in user", body = UserView),
        (status = 302, description = "No live session; redirect to the login page"),
    ),
    tag = "auth"
)]
pub async fn account(Extension(user): Extension<User>) -> Json<UserView> {
    Json(UserView::from(&user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_fields_deserialize_as_empty() {
        let request: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(request.email.is_empty());
        assert!(request.password.expose_secret().is_empty());

        let request: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.com","password":"abcd"}"#).unwrap();
        assert_eq!(request.email, "a@b.com");
        assert_eq!(request.password.expose_secret(), "abcd");
    }
}
