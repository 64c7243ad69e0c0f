//! HTTP Basic authentication for the JSON API.

use super::{authenticate, AuthError, Identity};
use crate::{
    api::{error::ApiError, handlers::normalize_email},
    store::SharedStore,
};
use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64ct::{Base64, Encoding};
use secrecy::SecretString;
use tracing::{debug, error};

#[derive(Debug)]
pub struct BasicCredentials {
    /// Normalized email.
    pub email: String,
    pub password: SecretString,
}

/// Parse `Authorization: Basic <base64(email:password)>`.
///
/// The password is everything after the first `:`, so it may contain colons.
pub fn parse_basic(headers: &HeaderMap) -> Option<BasicCredentials> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = Base64::decode_vec(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    Some(BasicCredentials {
        email: normalize_email(email),
        password: SecretString::from(password.to_string()),
    })
}

/// Route layer: reject requests without valid Basic credentials.
///
/// On success the caller's [`Identity`] is added to the request extensions.
pub async fn require_basic(
    store: Extension<SharedStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(credentials) = parse_basic(request.headers()) else {
        debug!("Missing or malformed Basic credentials");
        return ApiError::Unauthorized.into_response();
    };

    match authenticate(&**store, &credentials.email, credentials.password).await {
        Ok(user) => {
            request.extensions_mut().insert(Identity::from(&user));
            next.run(request).await
        }
        Err(AuthError::UnknownEmail(_) | AuthError::InvalidCredentials) => {
            debug!("Rejected Basic credentials for {}", credentials.email);
            ApiError::Unauthorized.into_response()
        }
        Err(err) => {
            error!("Failed to check Basic credentials: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use secrecy::ExposeSecret;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn basic(raw: &str) -> HeaderMap {
        headers(&format!("Basic {}", Base64::encode_string(raw.as_bytes())))
    }

    #[test]
    fn parses_and_normalizes() {
        let credentials = parse_basic(&basic(" Alice@Example.com :secret")).unwrap();
        assert_eq!(credentials.email, "alice@example.com");
        assert_eq!(credentials.password.expose_secret(), "secret");
    }

    #[test]
    fn password_keeps_colons() {
        let credentials = parse_basic(&basic("a@b.com:pa:ss")).unwrap();
        assert_eq!(credentials.password.expose_secret(), "pa:ss");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let value = format!("basic {}", Base64::encode_string(b"a@b.com:x"));
        assert!(parse_basic(&headers(&value)).is_some());
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(parse_basic(&HeaderMap::new()).is_none());
        assert!(parse_basic(&headers("Bearer abc")).is_none());
        assert!(parse_basic(&headers("Basic !!!")).is_none());
        assert!(parse_basic(&basic("no-colon")).is_none());
    }
}
