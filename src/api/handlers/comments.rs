//! Comment endpoints under `/api/posts/{post_id}/comments`.
//!
//! Comments are embedded in their post: every write loads the post, edits the
//! comment list and saves the whole post back.

use super::{non_empty, parse_object_id, posts::POST_NOT_FOUND};
use crate::{
    api::{auth::Identity, error::ApiError},
    model::{Comment, ObjectId, Post},
    store::{SharedStore, Store},
};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

pub const REQUIRED_COMMENT_FIELDS: &str =
    "One or more of the following required fields are empty: userId and text.";
pub const COMMENT_NOT_FOUND: &str = "Comment does not exist.";

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentRequest {
    user_id: Option<String>,
    text: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(default)]
pub struct CommentUpdate {
    text: Option<String>,
}

fn comment_not_found() -> ApiError {
    ApiError::NotFound(COMMENT_NOT_FOUND.to_string())
}

async fn load_post(store: &dyn Store, id: ObjectId) -> Result<Post, ApiError> {
    store
        .find_post(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(POST_NOT_FOUND.to_string()))
}

#[utoipa::path(
    post,
    path = "/api/posts/{post_id}/comments",
    params(
        ("post_id" = String, Path, description = "Post id")
    ),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment appended to the post", body = Comment),
        (status = 400, description = "Missing fields or invalid ids", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
        (status = 404, description = "Post not found", body = String),
    ),
    security(("basic" = [])),
    tag = "comments"
)]
#[instrument(skip_all)]
pub async fn create_comment(
    Path(post_id): Path<String>,
    Extension(identity): Extension<Identity>,
    store: Extension<SharedStore>,
    payload: Option<Json<CommentRequest>>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };
    let (Some(user_id), Some(text)) = (non_empty(request.user_id), non_empty(request.text)) else {
        return Err(ApiError::Validation(REQUIRED_COMMENT_FIELDS.to_string()));
    };
    let post_id = parse_object_id(&post_id)?;
    let user_id = parse_object_id(&user_id)?;

    let mut post = load_post(&**store, post_id).await?;
    let comment_id = post.add_comment(user_id, text, Utc::now());
    store.save_post(&post).await?;

    info!(caller = %identity.user_id, %post_id, %comment_id, "comment created");

    let comment = post.comment(comment_id).cloned().ok_or_else(comment_not_found)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    get,
    path = "/api/posts/{post_id}/comments",
    params(
        ("post_id" = String, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Comments in insertion order", body = [Comment]),
        (status = 400, description = "Invalid post id", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
        (status = 404, description = "Post not found", body = String),
    ),
    security(("basic" = [])),
    tag = "comments"
)]
pub async fn get_comments(
    Path(post_id): Path<String>,
    store: Extension<SharedStore>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let post_id = parse_object_id(&post_id)?;
    let post = load_post(&**store, post_id).await?;
    Ok(Json(post.comments.as_slice().to_vec()))
}

#[utoipa::path(
    get,
    path = "/api/posts/{post_id}/comments/{comment_id}",
    params(
        ("post_id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "The comment", body = Comment),
        (status = 400, description = "Invalid post or comment id", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
        (status = 404, description = "Post or comment not found", body = String),
    ),
    security(("basic" = [])),
    tag = "comments"
)]
pub async fn get_comment(
    Path((post_id, comment_id)): Path<(String, String)>,
    store: Extension<SharedStore>,
) -> Result<Json<Comment>, ApiError> {
    let post_id = parse_object_id(&post_id)?;
    let comment_id = parse_object_id(&comment_id)?;
    let post = load_post(&**store, post_id).await?;
    post.comment(comment_id)
        .cloned()
        .map(Json)
        .ok_or_else(comment_not_found)
}

#[utoipa::path(
    put,
    path = "/api/posts/{post_id}/comments/{comment_id}",
    params(
        ("post_id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    request_body = CommentUpdate,
    responses(
        (status = 200, description = "Comment text replaced", body = Comment),
        (status = 400, description = "Empty text or invalid ids", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
        (status = 404, description = "Post or comment not found", body = String),
    ),
    security(("basic" = [])),
    tag = "comments"
)]
#[instrument(skip_all)]
pub async fn update_comment(
    Path((post_id, comment_id)): Path<(String, String)>,
    Extension(identity): Extension<Identity>,
    store: Extension<SharedStore>,
    payload: Option<Json<CommentUpdate>>,
) -> Result<Json<Comment>, ApiError> {
    let post_id = parse_object_id(&post_id)?;
    let comment_id = parse_object_id(&comment_id)?;
    let Some(text) = payload.and_then(|Json(update)| non_empty(update.text)) else {
        return Err(ApiError::Validation("Comment text cannot be empty.".to_string()));
    };

    let mut post = load_post(&**store, post_id).await?;
    if !post.edit_comment(comment_id, text, Utc::now()) {
        return Err(comment_not_found());
    }
    store.save_post(&post).await?;

    info!(caller = %identity.user_id, %post_id, %comment_id, "comment updated");

    post.comment(comment_id)
        .cloned()
        .map(Json)
        .ok_or_else(comment_not_found)
}

#[utoipa::path(
    delete,
    path = "/api/posts/{post_id}/comments/{comment_id}",
    params(
        ("post_id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment removed"),
        (status = 400, description = "Invalid post or comment id", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
        (status = 404, description = "Post or comment not found", body = String),
    ),
    security(("basic" = [])),
    tag = "comments"
)]
#[instrument(skip_all)]
pub async fn delete_comment(
    Path((post_id, comment_id)): Path<(String, String)>,
    Extension(identity): Extension<Identity>,
    store: Extension<SharedStore>,
) -> Result<StatusCode, ApiError> {
    let post_id = parse_object_id(&post_id)?;
    let comment_id = parse_object_id(&comment_id)?;

    let mut post = load_post(&**store, post_id).await?;
    if post.remove_comment(comment_id, Utc::now()).is_none() {
        return Err(comment_not_found());
    }
    store.save_post(&post).await?;

    info!(caller = %identity.user_id, %post_id, %comment_id, "comment removed");

    Ok(StatusCode::OK)
}
