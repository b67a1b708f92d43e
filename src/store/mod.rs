//! Content store access
//!
//! The store itself is external. [`HttpStore`] talks to the hosted document
//! API; [`MemoryStore`] evaluates the same queries over an in-process
//! document set for offline previews and tests.

mod http;
mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::content::NewComment;
use crate::query::Query;

/// Failures talking to the content store
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Network failure or timeout; the store may be back shortly
    #[error("content store unreachable: {0}")]
    Unreachable(String),

    /// The store answered with an error status
    #[error("content store returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The store answered with something we can't read
    #[error("unexpected content store response: {0}")]
    Decode(String),

    /// Writes need a token and none was configured
    #[error("content store writes require an API token")]
    MissingToken,
}

impl StoreError {
    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::MissingToken => false,
        }
    }
}

/// Read and write operations offered by the content store
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Run a read query; `Value::Null` when a single-document query matches
    /// nothing
    async fn fetch(&self, query: &Query) -> Result<Value, StoreError>;

    /// Create one comment document and return its id once the store has
    /// confirmed the write
    async fn create(&self, document: &NewComment) -> Result<String, StoreError>;
}
