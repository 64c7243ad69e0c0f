//! Cookie sessions for the browser login flow.

use super::{AuthConfig, Identity};
use crate::{
    model::ObjectId,
    store::{SessionRecord, SharedStore, Store, StoreResult},
};
use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Request},
    http::{
        header::{InvalidHeaderValue, COOKIE, LOCATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error};

pub const SESSION_COOKIE_NAME: &str = "postline_session";

/// Create a new session token for the auth cookie.
/// The raw value is only returned to set the cookie; the store keeps a hash.
pub fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

pub fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Persist a session for `user_id` and return the raw cookie token.
pub async fn start_session(
    store: &dyn Store,
    config: &AuthConfig,
    user_id: ObjectId,
) -> Result<String> {
    let token = generate_session_token()?;
    let record = SessionRecord {
        token_hash: hash_session_token(&token),
        user_id,
        expires_at: Utc::now() + Duration::seconds(config.session_ttl_seconds()),
    };
    store
        .insert_session(&record)
        .await
        .context("failed to store session")?;
    Ok(token)
}

/// Drop the session named by the request cookie, if any.
pub async fn end_session(store: &dyn Store, headers: &HeaderMap) -> StoreResult<()> {
    match extract_session_token(headers) {
        Some(token) => store.remove_session(&hash_session_token(&token)).await,
        None => Ok(()),
    }
}

pub fn session_cookie(config: &AuthConfig, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        let Some((key, val)) = pair.trim().split_once('=') else {
            continue;
        };
        let val = val.trim();
        if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

fn login_redirect(config: &AuthConfig) -> Response {
    (StatusCode::FOUND, [(LOCATION, config.login_path())]).into_response()
}

/// Route layer for browser pages: redirect to the login page unless the
/// request carries a live session cookie.
///
/// The account is re-read on every request; both [`Identity`] and the
/// [`crate::model::User`] are added to the request extensions.
pub async fn require_session(
    store: Extension<SharedStore>,
    config: Extension<Arc<AuthConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_session_token(request.headers()) else {
        return login_redirect(&config);
    };

    let session = match store.find_session(&hash_session_token(&token)).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            debug!("Unknown or expired session");
            return login_redirect(&config);
        }
        Err(err) => {
            error!("Failed to lookup session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match store.find_user_by_id(session.user_id).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(Identity::from(&user));
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => {
            debug!("Session owner {} no longer exists", session.user_id);
            login_redirect(&config)
        }
        Err(err) => {
            error!("Failed to load session owner: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn generated_tokens_decode_to_32_bytes() {
        let decoded_len = generate_session_token()
            .ok()
            .and_then(|token| Base64UrlUnpadded::decode_vec(&token).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(hash_session_token("t"), hash_session_token("t"));
        assert_ne!(hash_session_token("t"), hash_session_token("u"));
        assert_eq!(hash_session_token("t").len(), 32);
    }

    #[test]
    fn cookie_attributes() {
        let config = AuthConfig::new().with_session_ttl_seconds(60);
        let cookie = session_cookie(&config, "abc").unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "postline_session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );

        let secure = config.with_session_cookie_secure(true);
        assert!(session_cookie(&secure, "abc")
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("; Secure"));
        assert!(clear_session_cookie(&secure)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));
    }

    #[test]
    fn extracts_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; postline_session=tok; lang=en"),
        );
        assert_eq!(extract_session_token(&headers), Some("tok".to_string()));

        headers.insert(COOKIE, HeaderValue::from_static("postline_session="));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[tokio::test]
    async fn start_and_end_session() {
        let store = MemoryStore::new();
        let config = AuthConfig::new();
        let user_id = ObjectId::new();
        let token = start_session(&store, &config, user_id).await.unwrap();

        let hash = hash_session_token(&token);
        let record = store.find_session(&hash).await.unwrap();
        assert_eq!(record.map(|r| r.user_id), Some(user_id));

        let mut headers = HeaderMap::new();
        let cookie = format!("{SESSION_COOKIE_NAME}={token}");
        headers.insert(COOKIE, HeaderValue::from_str(&cookie).unwrap());
        end_session(&store, &headers).await.unwrap();
        assert!(store.find_session(&hash).await.unwrap().is_none());
    }
}
