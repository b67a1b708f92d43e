//! Comment documents

use serde::{Deserialize, Serialize};

use super::moderation::{self, ModerationState};
use super::post::null_default;
use super::Reference;

/// Document type name of comments in the content store
pub const COMMENT_TYPE: &str = "comment";

/// A stored comment, as returned by post queries
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,

    /// Commenter display name
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,

    /// Comment text
    #[serde(default, deserialize_with = "null_default")]
    pub comment: String,

    /// Parent post
    #[serde(default)]
    pub post: Option<Reference>,

    /// Moderation state, from the stored `approved` flag
    #[serde(
        default,
        rename = "approved",
        deserialize_with = "moderation::deserialize_flag"
    )]
    pub state: ModerationState,
}

/// A comment about to be created.
///
/// `approved` is deliberately absent: new comments start pending.
#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    #[serde(rename = "_type")]
    kind: &'static str,
    pub post: Reference,
    pub name: String,
    pub email: String,
    pub comment: String,
}

impl NewComment {
    pub fn new(post_id: &str, name: &str, email: &str, comment: &str) -> Self {
        Self {
            kind: COMMENT_TYPE,
            post: Reference::to(post_id),
            name: name.to_string(),
            email: email.to_string(),
            comment: comment.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_comment_document_shape() {
        let doc = NewComment::new("post-1", "Alice", "a@x.com", "Nice post!");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "_type": "comment",
                "post": { "_type": "reference", "_ref": "post-1" },
                "name": "Alice",
                "email": "a@x.com",
                "comment": "Nice post!"
            })
        );
        assert!(value.get("approved").is_none());
    }

    #[test]
    fn test_comment_without_flag_is_pending() {
        let c: Comment = serde_json::from_value(json!({
            "_id": "c1",
            "name": "Bob",
            "comment": "hi",
            "post": { "_ref": "post-1", "_type": "reference" }
        }))
        .unwrap();
        assert_eq!(c.state, ModerationState::Pending);

        let c: Comment = serde_json::from_value(json!({
            "_id": "c2",
            "name": "Bob",
            "comment": "hi",
            "approved": true
        }))
        .unwrap();
        assert_eq!(c.state, ModerationState::Approved);
    }
}
