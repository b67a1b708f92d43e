//! Comment submission handler
//!
//! Turns a validated submission into a pending comment document and writes
//! it with a single create. Nothing here touches rendered pages: a new
//! comment shows up only after approval and the next regeneration of its
//! post.

mod form;

pub use form::{CommentForm, ValidationError};

use std::sync::Arc;

use crate::content::NewComment;
use crate::store::{ContentStore, StoreError};

/// Why a submission was not stored
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The body isn't a JSON object
    #[error("malformed payload: {0}")]
    Payload(String),

    /// One or more fields failed validation
    #[error("invalid submission ({} field errors)", .0.len())]
    Validation(Vec<ValidationError>),

    /// The store didn't confirm the write
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SubmitError {
    /// Short description safe to hand back to the submitter
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Payload(_) => "malformed payload",
            Self::Validation(_) => "invalid fields",
            Self::Store(StoreError::Unreachable(_)) => "content store unavailable",
            Self::Store(StoreError::Api { .. }) => "content store rejected the comment",
            Self::Store(StoreError::Decode(_)) => "unexpected content store response",
            Self::Store(StoreError::MissingToken) => "comments are not accepted right now",
        }
    }
}

/// A comment the store has accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedComment {
    pub id: String,
    pub post_id: String,
}

/// Write path for new comments
#[derive(Clone)]
pub struct SubmissionHandler {
    store: Arc<dyn ContentStore>,
}

impl SubmissionHandler {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Validate and store a comment, pending moderation
    pub async fn submit(&self, form: &CommentForm) -> Result<SubmittedComment, SubmitError> {
        let mut errors = match form.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };
        if form.post_id.trim().is_empty() {
            errors.insert(
                0,
                ValidationError {
                    field: "_id",
                    message: "The post id is required".to_string(),
                },
            );
        }
        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "Rejected comment submission");
            return Err(SubmitError::Validation(errors));
        }

        let post_id = form.post_id.trim();
        let document = NewComment::new(
            post_id,
            form.name.trim(),
            form.email.trim(),
            form.comment.trim(),
        );

        match self.store.create(&document).await {
            Ok(id) => {
                tracing::info!(id = %id, post_id, "Comment stored, pending moderation");
                Ok(SubmittedComment {
                    id,
                    post_id: post_id.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(post_id, error = %e, "Failed to store comment");
                Err(SubmitError::Store(e))
            }
        }
    }
}
