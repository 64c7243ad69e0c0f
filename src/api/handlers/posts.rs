//! Post endpoints under `/api/posts`.

use super::{non_empty, parse_object_id};
use crate::{
    api::{auth::Identity, error::ApiError},
    model::{NewPost, ObjectId, Post, PostFilter, PostPatch},
    store::SharedStore,
};
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

pub const REQUIRED_POST_FIELDS: &str =
    "One or more of the following required fields are empty: userId, title and text";
pub const POST_EXISTS: &str = "Post already exists.";
pub const POST_NOT_FOUND: &str = "Post does not exist.";

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PostRequest {
    user_id: Option<String>,
    group_id: Option<String>,
    title: Option<String>,
    tags: Option<Vec<String>>,
    text: Option<String>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub struct PostQuery {
    /// Author id.
    user_id: Option<String>,
    /// Case-insensitive regular expression matched against the title.
    title: Option<String>,
    /// Exact tag.
    tag: Option<String>,
}

fn parse_optional_id(value: Option<String>) -> Result<Option<ObjectId>, ApiError> {
    non_empty(value)
        .map(|value| parse_object_id(&value))
        .transpose()
}

fn new_post(request: PostRequest) -> Result<NewPost, ApiError> {
    let (Some(user_id), Some(title), Some(text)) = (
        non_empty(request.user_id),
        non_empty(request.title),
        non_empty(request.text),
    ) else {
        return Err(ApiError::Validation(REQUIRED_POST_FIELDS.to_string()));
    };
    Ok(NewPost {
        user_id: parse_object_id(&user_id)?,
        group_id: parse_optional_id(request.group_id)?,
        title,
        tags: request.tags.unwrap_or_default(),
        text,
    })
}

fn post_patch(request: PostRequest) -> Result<PostPatch, ApiError> {
    Ok(PostPatch {
        user_id: parse_optional_id(request.user_id)?,
        group_id: parse_optional_id(request.group_id)?,
        title: non_empty(request.title),
        tags: request.tags,
        text: non_empty(request.text),
    })
}

fn post_filter(query: PostQuery) -> Result<PostFilter, ApiError> {
    let filter = PostFilter {
        user_id: parse_optional_id(query.user_id)?,
        tag: non_empty(query.tag),
        ..PostFilter::default()
    };
    match non_empty(query.title) {
        Some(pattern) => filter
            .with_title(&pattern)
            .map_err(|_| ApiError::Validation("Invalid title pattern.".to_string())),
        None => Ok(filter),
    }
}

#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = PostRequest,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Missing fields, invalid ids or duplicate post", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
    ),
    security(("basic" = [])),
    tag = "posts"
)]
#[instrument(skip_all)]
pub async fn create_post(
    Extension(identity): Extension<Identity>,
    store: Extension<SharedStore>,
    payload: Option<Json<PostRequest>>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };
    let new = new_post(request)?;

    if store
        .find_duplicate_post(new.user_id, &new.title, &new.text)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(POST_EXISTS.to_string()));
    }

    let post = Post::new(new, Utc::now());
    store.insert_post(&post).await?;

    info!(caller = %identity.user_id, post_id = %post.id, "post created");

    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    get,
    path = "/api/posts",
    params(PostQuery),
    responses(
        (status = 200, description = "Matching posts, oldest first", body = [Post]),
        (status = 400, description = "Invalid userId or title pattern", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
    ),
    security(("basic" = [])),
    tag = "posts"
)]
pub async fn get_posts(
    store: Extension<SharedStore>,
    Query(query): Query<PostQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let filter = post_filter(query)?;
    let posts = store.find_posts(&filter).await?;
    debug!("Found {} posts", posts.len());
    Ok(Json(posts))
}

#[utoipa::path(
    get,
    path = "/api/posts/{post_id}",
    params(
        ("post_id" = String, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Post with its comments", body = Post),
        (status = 400, description = "Invalid post id", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
        (status = 404, description = "Post not found", body = String),
    ),
    security(("basic" = [])),
    tag = "posts"
)]
pub async fn get_post(
    Path(post_id): Path<String>,
    store: Extension<SharedStore>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_object_id(&post_id)?;
    store
        .find_post(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(POST_NOT_FOUND.to_string()))
}

#[utoipa::path(
    put,
    path = "/api/posts/{post_id}",
    params(
        ("post_id" = String, Path, description = "Post id")
    ),
    request_body = PostRequest,
    responses(
        (status = 200, description = "Updated post", body = Post),
        (status = 400, description = "Invalid post id or field ids", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
        (status = 404, description = "Post not found", body = String),
    ),
    security(("basic" = [])),
    tag = "posts"
)]
#[instrument(skip_all)]
pub async fn update_post(
    Path(post_id): Path<String>,
    Extension(identity): Extension<Identity>,
    store: Extension<SharedStore>,
    payload: Option<Json<PostRequest>>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_object_id(&post_id)?;
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };
    let patch = post_patch(request)?;
    if patch.is_empty() {
        debug!("Empty update for post {id}; only updatedAt changes");
    }

    match store.update_post(id, patch).await? {
        Some(post) => {
            info!(caller = %identity.user_id, post_id = %post.id, "post updated");
            Ok(Json(post))
        }
        None => Err(ApiError::NotFound(POST_NOT_FOUND.to_string())),
    }
}

#[utoipa::path(
    delete,
    path = "/api/posts/{post_id}",
    params(
        ("post_id" = String, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Post and its comments removed"),
        (status = 400, description = "Invalid post id", body = String),
        (status = 401, description = "Missing or invalid Basic credentials"),
        (status = 404, description = "Post not found", body = String),
    ),
    security(("basic" = [])),
    tag = "posts"
)]
#[instrument(skip_all)]
pub async fn delete_post(
    Path(post_id): Path<String>,
    Extension(identity): Extension<Identity>,
    store: Extension<SharedStore>,
) -> Result<StatusCode, ApiError> {
    let id = parse_object_id(&post_id)?;
    match store.remove_post(id).await? {
        Some(post) => {
            info!(
                caller = %identity.user_id,
                post_id = %post.id,
                comments = post.comments.len(),
                "post removed"
            );
            Ok(StatusCode::OK)
        }
        None => Err(ApiError::NotFound(POST_NOT_FOUND.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::INVALID_OBJECT_ID;

    const ID: &str = "5a266bd64765b940ec7e8765";

    fn validation(err: ApiError) -> Option<String> {
        match err {
            ApiError::Validation(message) => Some(message),
            _ => None,
        }
    }

    #[test]
    fn new_post_requires_user_title_and_text() {
        let request = PostRequest {
            user_id: Some(ID.to_string()),
            title: Some(String::new()),
            text: Some("body".to_string()),
            ..PostRequest::default()
        };
        let err = new_post(request).err().and_then(validation);
        assert_eq!(err.as_deref(), Some(REQUIRED_POST_FIELDS));
    }

    #[test]
    fn new_post_rejects_malformed_ids() {
        let request = PostRequest {
            user_id: Some("123".to_string()),
            title: Some("t".to_string()),
            text: Some("x".to_string()),
            ..PostRequest::default()
        };
        let err = new_post(request).err().and_then(validation);
        assert_eq!(err.as_deref(), Some(INVALID_OBJECT_ID));

        let request = PostRequest {
            user_id: Some(ID.to_string()),
            group_id: Some("zz".to_string()),
            title: Some("t".to_string()),
            text: Some("x".to_string()),
            ..PostRequest::default()
        };
        assert!(new_post(request).is_err());
    }

    #[test]
    fn patch_ignores_empty_strings_but_keeps_tags() {
        let request = PostRequest {
            title: Some(String::new()),
            tags: Some(Vec::new()),
            text: Some("new".to_string()),
            ..PostRequest::default()
        };
        let patch = post_patch(request).ok();
        assert_eq!(
            patch,
            Some(PostPatch {
                tags: Some(Vec::new()),
                text: Some("new".to_string()),
                ..PostPatch::default()
            })
        );
    }

    #[test]
    fn filter_validates_user_id_and_pattern() {
        let query = PostQuery {
            user_id: Some("bad".to_string()),
            ..PostQuery::default()
        };
        assert!(post_filter(query).is_err());

        let query = PostQuery {
            title: Some("(".to_string()),
            ..PostQuery::default()
        };
        let err = post_filter(query).err().and_then(validation);
        assert_eq!(err.as_deref(), Some("Invalid title pattern."));

        let query = PostQuery {
            user_id: Some(ID.to_string()),
            tag: Some("rust".to_string()),
            ..PostQuery::default()
        };
        let filter = post_filter(query).ok();
        assert_eq!(filter.as_ref().and_then(|f| f.tag.as_deref()), Some("rust"));
        assert!(filter.is_some_and(|f| f.user_id.is_some() && f.title.is_none()));
    }
}
