//! Domain types: users, posts and their embedded comments.

pub mod object_id;
pub mod post;
pub mod user;

pub use object_id::{InvalidObjectId, ObjectId, INVALID_OBJECT_ID};
pub use post::{Comment, Comments, NewPost, Post, PostFilter, PostPatch};
pub use user::{AuthToken, Profile, User, UserPatch, UserView};
