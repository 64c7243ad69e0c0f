//! Posts and the comments they own.
//!
//! A comment has no life of its own: it is created, read, edited and removed
//! through its parent [`Post`], which keeps them in insertion order.

use super::ObjectId;
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    #[schema(value_type = String, example = "5a266bd64765b940ec7e8765")]
    pub id: ObjectId,
    #[schema(value_type = String)]
    pub user_id: ObjectId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ordered comment list of a single post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Comments(Vec<Comment>);

impl Comments {
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&Comment> {
        self.0.iter().find(|comment| comment.id == id)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut Comment> {
        self.0.iter_mut().find(|comment| comment.id == id)
    }

    fn push(&mut self, comment: Comment) {
        self.0.push(comment);
    }

    fn remove(&mut self, id: ObjectId) -> Option<Comment> {
        let index = self.0.iter().position(|comment| comment.id == id)?;
        Some(self.0.remove(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Comment] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    #[schema(value_type = String, example = "5a266bd64765b940ec7e8765")]
    pub id: ObjectId,
    #[schema(value_type = String)]
    pub user_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub group_id: Option<ObjectId>,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub text: String,
    #[serde(default)]
    #[schema(value_type = Vec<Comment>)]
    pub comments: Comments,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new post, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub user_id: ObjectId,
    pub group_id: Option<ObjectId>,
    pub title: String,
    pub tags: Vec<String>,
    pub text: String,
}

impl Post {
    #[must_use]
    pub fn new(new: NewPost, now: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::new(),
            user_id: new.user_id,
            group_id: new.group_id,
            title: new.title,
            tags: new.tags,
            text: new.text,
            comments: Comments::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update. Pure: comments and timestamps of creation are kept.
    #[must_use]
    pub fn apply(self, patch: PostPatch, now: DateTime<Utc>) -> Self {
        Self {
            user_id: patch.user_id.unwrap_or(self.user_id),
            group_id: patch.group_id.or(self.group_id),
            title: patch.title.unwrap_or(self.title),
            tags: patch.tags.unwrap_or(self.tags),
            text: patch.text.unwrap_or(self.text),
            updated_at: now,
            ..self
        }
    }

    #[must_use]
    pub fn comment(&self, id: ObjectId) -> Option<&Comment> {
        self.comments.get(id)
    }

    /// Append a comment and return its id.
    pub fn add_comment(&mut self, user_id: ObjectId, text: String, now: DateTime<Utc>) -> ObjectId {
        let id = ObjectId::new();
        self.comments.push(Comment {
            id,
            user_id,
            text,
            created_at: now,
            updated_at: now,
        });
        self.updated_at = now;
        id
    }

    /// Rewrite the text of one comment. Returns `false` when the id is unknown.
    pub fn edit_comment(&mut self, id: ObjectId, text: String, now: DateTime<Utc>) -> bool {
        let Some(comment) = self.comments.get_mut(id) else {
            return false;
        };
        comment.text = text;
        comment.updated_at = now;
        self.updated_at = now;
        true
    }

    pub fn remove_comment(&mut self, id: ObjectId, now: DateTime<Utc>) -> Option<Comment> {
        let removed = self.comments.remove(id)?;
        self.updated_at = now;
        Some(removed)
    }
}

/// Fields a `PUT /api/posts/{postId}` may overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub user_id: Option<ObjectId>,
    pub group_id: Option<ObjectId>,
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub text: Option<String>,
}

impl PostPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.group_id.is_none()
            && self.title.is_none()
            && self.tags.is_none()
            && self.text.is_none()
    }
}

/// Conjunctive search over posts; an empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub user_id: Option<ObjectId>,
    pub title: Option<Regex>,
    pub tag: Option<String>,
}

impl PostFilter {
    /// Case-insensitive title pattern.
    ///
    /// # Errors
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn with_title(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.title = Some(RegexBuilder::new(pattern).case_insensitive(true).build()?);
        Ok(self)
    }

    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        self.user_id.map_or(true, |user_id| post.user_id == user_id)
            && self.title.as_ref().map_or(true, |re| re.is_match(&post.title))
            && self
                .tag
                .as_ref()
                .map_or(true, |tag| post.tags.iter().any(|t| t == tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> Post {
        Post::new(
            NewPost {
                user_id: ObjectId::new(),
                group_id: None,
                title: "My first post".to_string(),
                tags: vec!["general".to_string(), "first".to_string()],
                text: "This is my first Post".to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn new_post_starts_without_comments() {
        let post = sample_post();
        assert!(post.comments.is_empty());
        assert_eq!(post.created_at, post.updated_at);
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let post = sample_post();
        let patch = PostPatch {
            title: Some("Renamed".to_string()),
            ..PostPatch::default()
        };
        let updated = post.clone().apply(patch, Utc::now());
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.text, post.text);
        assert_eq!(updated.tags, post.tags);
        assert_eq!(updated.user_id, post.user_id);
        assert_eq!(updated.id, post.id);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(PostPatch::default().is_empty());
        let patch = PostPatch {
            tags: Some(Vec::new()),
            ..PostPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn comments_are_addressed_by_id() {
        let mut post = sample_post();
        let author = ObjectId::new();
        let first = post.add_comment(author, "one".to_string(), Utc::now());
        let second = post.add_comment(author, "two".to_string(), Utc::now());
        assert_eq!(post.comments.len(), 2);

        assert!(post.edit_comment(second, "two, edited".to_string(), Utc::now()));
        assert_eq!(
            post.comment(second).map(|c| c.text.as_str()),
            Some("two, edited")
        );

        assert!(post.remove_comment(first, Utc::now()).is_some());
        assert!(post.comment(first).is_none());
        assert!(post.comment(second).is_some());
        assert_eq!(post.comments.len(), 1);
    }

    #[test]
    fn unknown_comment_ids_are_reported() {
        let mut post = sample_post();
        let missing = ObjectId::new();
        assert!(!post.edit_comment(missing, "x".to_string(), Utc::now()));
        assert!(post.remove_comment(missing, Utc::now()).is_none());
    }

    #[test]
    fn filter_is_conjunctive_and_title_case_insensitive() -> Result<(), regex::Error> {
        let post = sample_post();
        assert!(PostFilter::default().matches(&post));

        let by_title = PostFilter::default().with_title("FIRST")?;
        assert!(by_title.matches(&post));

        let mut both = PostFilter::default().with_title("first")?;
        both.tag = Some("general".to_string());
        assert!(both.matches(&post));

        both.tag = Some("missing".to_string());
        assert!(!both.matches(&post));

        let other_user = PostFilter {
            user_id: Some(ObjectId::new()),
            ..PostFilter::default()
        };
        assert!(!other_user.matches(&post));
        Ok(())
    }

    #[test]
    fn invalid_title_pattern_is_an_error() {
        assert!(PostFilter::default().with_title("(unclosed").is_err());
    }

    #[test]
    fn comments_serialize_as_plain_array() -> Result<(), serde_json::Error> {
        let mut post = sample_post();
        post.add_comment(ObjectId::new(), "hi".to_string(), Utc::now());
        let json = serde_json::to_value(&post)?;
        assert!(json["comments"].is_array());
        assert_eq!(json["comments"][0]["text"], "hi");
        assert_eq!(json["userId"], post.user_id.to_string());
        Ok(())
    }
}
