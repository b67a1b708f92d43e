//! Query layer - declarative reads against the content store
//!
//! Queries are plain values that render to GROQ text plus bound parameters.
//! The comment filter of [`Query::PostBySlug`] is correlated on the parent
//! post's `_id` inside the query itself, so the moderation gate holds no
//! matter how the store caches or pages results.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::content::{moderation, Post, PostSlug, Slug};
use crate::store::{ContentStore, StoreError};

/// Resolve one post by slug, with author expanded and approved comments only
pub const POST_BY_SLUG: &str = r#"*[_type == "post" && slug.current == $slug][0]{
  _id,
  _createdAt,
  title,
  description,
  slug,
  mainImage,
  body,
  author->{
    name,
    image
  },
  "comments": *[_type == "comment" && post._ref == ^._id && approved == true]{
    _id,
    name,
    comment,
    post,
    approved
  }
}"#;

/// All post identities and slugs, unfiltered
pub const POST_SLUGS: &str = r#"*[_type == "post"] | order(slug.current asc){
  _id,
  slug {
    current
  }
}"#;

/// A read query with its bound parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    PostBySlug { slug: String },
    PostSlugs,
}

impl Query {
    pub fn post_by_slug(slug: &str) -> Self {
        Self::PostBySlug {
            slug: slug.to_string(),
        }
    }

    /// GROQ text of the query
    pub fn groq(&self) -> &'static str {
        match self {
            Self::PostBySlug { .. } => POST_BY_SLUG,
            Self::PostSlugs => POST_SLUGS,
        }
    }

    /// Bound parameters, by name without the `$` sigil
    pub fn params(&self) -> Vec<(&'static str, Value)> {
        match self {
            Self::PostBySlug { slug } => vec![("slug", Value::String(slug.clone()))],
            Self::PostSlugs => Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct SlugRow {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    slug: Option<Slug>,
}

/// Read operations used by page generation
#[derive(Clone)]
pub struct QueryLayer {
    store: Arc<dyn ContentStore>,
}

impl QueryLayer {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Resolve a post by slug. `Ok(None)` means no such post.
    pub async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        let value = self.store.fetch(&Query::post_by_slug(slug)).await?;
        if value.is_null() {
            tracing::debug!(slug, "No post for slug");
            return Ok(None);
        }

        let mut post: Post =
            serde_json::from_value(value).map_err(|e| StoreError::Decode(e.to_string()))?;

        let returned = post.comments.len();
        post.comments = moderation::visible_comments(&post.id, std::mem::take(&mut post.comments));
        if post.comments.len() != returned {
            tracing::warn!(
                slug,
                dropped = returned - post.comments.len(),
                "Store returned comments that fail the moderation gate"
            );
        }

        Ok(Some(post))
    }

    /// List every post's id and slug, sorted by slug.
    ///
    /// Posts without a slug can't be routed to and are skipped.
    pub async fn all_slugs(&self) -> Result<Vec<PostSlug>, StoreError> {
        let value = self.store.fetch(&Query::PostSlugs).await?;
        let rows: Vec<SlugRow> = if value.is_null() {
            Vec::new()
        } else {
            serde_json::from_value(value).map_err(|e| StoreError::Decode(e.to_string()))?
        };

        let mut slugs: Vec<PostSlug> = rows
            .into_iter()
            .filter_map(|row| match row.slug {
                Some(slug) if !slug.current.is_empty() => Some(PostSlug {
                    slug: slug.current,
                    id: row.id,
                }),
                _ => {
                    tracing::warn!(id = %row.id, "Skipping post without a slug");
                    None
                }
            })
            .collect();
        slugs.sort();

        Ok(slugs)
    }
}
