//! Comment moderation gate
//!
//! Comments are created pending and become visible only once a moderator
//! approves them outside this system. There is no way back to pending.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::Comment;

/// Moderation lifecycle of a comment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    /// Stored but not shown anywhere
    #[default]
    Pending,
    /// Shown on its post's page
    Approved,
}

impl ModerationState {
    /// Derive the state from the stored `approved` field.
    ///
    /// Only a literal `true` approves; a missing field, `false`, or any
    /// other value keeps the comment pending.
    pub fn from_flag(flag: Option<&Value>) -> Self {
        match flag {
            Some(Value::Bool(true)) => Self::Approved,
            _ => Self::Pending,
        }
    }

    pub fn is_approved(self) -> bool {
        self == Self::Approved
    }

    /// Moderator approval. Approving twice is a no-op.
    pub fn approve(self) -> Self {
        Self::Approved
    }
}

/// Deserialize the `approved` field into a [`ModerationState`]
pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> Result<ModerationState, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = Option::<Value>::deserialize(deserializer)?;
    Ok(ModerationState::from_flag(flag.as_ref()))
}

/// Whether a comment may be shown on the post with id `post_id`
pub fn is_visible_on(comment: &Comment, post_id: &str) -> bool {
    comment.state.is_approved()
        && comment
            .post
            .as_ref()
            .is_some_and(|reference| reference.target == post_id)
}

/// Keep only the comments visible on `post_id`, preserving order
pub fn visible_comments(post_id: &str, comments: Vec<Comment>) -> Vec<Comment> {
    comments
        .into_iter()
        .filter(|c| is_visible_on(c, post_id))
        .collect()
}
