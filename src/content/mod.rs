//! Content module - posts, authors, comments and their moderation state

mod comment;
pub mod moderation;
pub mod portable;
mod post;

pub use comment::{Comment, NewComment, COMMENT_TYPE};
pub use moderation::ModerationState;
pub use portable::Block;
pub use post::{Author, ImageRef, Post, PostSlug, Reference, Slug};
