use crate::store::SharedStore;
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error;
pub mod handlers;
// OpenAPI document lives in openapi.rs.
mod openapi;

pub use auth::AuthConfig;
pub use openapi::openapi;

use handlers::{comments, health, login, posts, users};

/// Routes that need HTTP Basic credentials, without the auth layer.
fn basic_routes() -> Router {
    Router::new()
        .route(
            "/api/users",
            get(users::find_by_email)
                .put(users::update)
                .delete(users::delete_by_email),
        )
        .route("/api/posts", post(posts::create_post).get(posts::get_posts))
        .route(
            "/api/posts/:post_id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/api/posts/:post_id/comments",
            post(comments::create_comment).get(comments::get_comments),
        )
        .route(
            "/api/posts/:post_id/comments/:comment_id",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
}

/// Build the application router with every layer and extension in place.
#[must_use]
pub fn router(store: SharedStore, auth_config: AuthConfig) -> Router {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/api/login", post(login::login))
        .route("/api/logout", post(login::logout))
        .route("/api/users", post(users::create));

    let basic = basic_routes().route_layer(middleware::from_fn(auth::basic::require_basic));

    let browser = Router::new()
        .route("/account", get(login::account))
        .route_layer(middleware::from_fn(auth::session::require_session));

    Router::new()
        .merge(public)
        .merge(basic)
        .merge(browser)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(Arc::new(auth_config)))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, store: SharedStore, auth_config: AuthConfig) -> Result<()> {
    let app = router(store, auth_config);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::auth::Identity,
        model::{ObjectId, INVALID_OBJECT_ID},
        store::MemoryStore,
    };
    use axum::{body::to_bytes, http::StatusCode};
    use tower::ServiceExt;

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_ids_are_rejected_before_the_store() {
        let store = Arc::new(MemoryStore::new());
        let caller = Identity {
            user_id: ObjectId::new(),
            email: "a@b.com".to_string(),
        };
        let app = basic_routes()
            .layer(Extension(caller))
            .layer(Extension(store.clone() as SharedStore));

        for (method, uri) in [
            ("GET", "/api/posts/123"),
            ("DELETE", "/api/posts/not-an-id"),
            ("GET", "/api/posts/123/comments"),
            ("GET", "/api/posts/5a266bd64765b940ec7e8765/comments/xyz"),
            ("DELETE", "/api/posts/123/comments/5a266bd64765b940ec7e8765"),
        ] {
            let response = app.clone().oneshot(request(method, uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method} {uri}");
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], INVALID_OBJECT_ID.as_bytes());
        }

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn request_id_is_generated_and_propagated() {
        let app = router(Arc::new(MemoryStore::new()), AuthConfig::new());
        let response = app.oneshot(request("GET", "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert!(id.is_some_and(|id| id.len() == 26));
    }

    #[tokio::test]
    async fn head_health_has_no_body() {
        let app = router(Arc::new(MemoryStore::new()), AuthConfig::new());
        let response = app.oneshot(request("HEAD", "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}
