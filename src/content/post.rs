//! Post and Author documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::portable::Block;
use super::Comment;

/// Treat an explicit `null` the same as a missing field.
///
/// Projections from the content store return `null` for every projected
/// field a document doesn't have, so plain `#[serde(default)]` isn't enough.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A blog post, as resolved by the query layer
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    /// Document identity
    #[serde(rename = "_id")]
    pub id: String,

    /// Creation timestamp. Hand-written fixtures may leave it out.
    #[serde(rename = "_createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Post title
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,

    /// Short description shown under the title
    #[serde(default)]
    pub description: Option<String>,

    /// URL-safe addressable key
    #[serde(default)]
    pub slug: Option<Slug>,

    /// Rich-content body
    #[serde(default, deserialize_with = "null_default")]
    pub body: Vec<Block>,

    /// Hero image
    #[serde(default, rename = "mainImage")]
    pub main_image: Option<ImageRef>,

    /// Author, expanded from the post's reference
    #[serde(default)]
    pub author: Option<Author>,

    /// Approved comments attached to this post
    #[serde(default, deserialize_with = "null_default")]
    pub comments: Vec<Comment>,
}

impl Post {
    /// The post's slug, or an empty string when it has none
    pub fn slug(&self) -> &str {
        self.slug.as_ref().map(|s| s.current.as_str()).unwrap_or("")
    }
}

/// Slug object as stored (`{ "current": "my-post" }`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug {
    pub current: String,
}

/// An author, expanded to display fields only
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// Image field pointing at an uploaded asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub asset: Option<Reference>,
}

impl ImageRef {
    /// The referenced asset id, e.g. `image-abc123-800x600-jpg`
    pub fn asset_id(&self) -> Option<&str> {
        self.asset.as_ref().map(|r| r.target.as_str())
    }
}

/// A reference from one document to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_type", default = "Reference::kind")]
    pub kind: String,
    #[serde(rename = "_ref")]
    pub target: String,
}

impl Reference {
    fn kind() -> String {
        "reference".to_string()
    }

    /// Create a reference to the document with the given id
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            kind: Self::kind(),
            target: target.into(),
        }
    }
}

/// Entry of the slug listing used to drive prerendering
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostSlug {
    pub slug: String,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_projection_with_nulls() {
        let value = json!({
            "_id": "post-1",
            "_createdAt": "2022-03-01T10:00:00Z",
            "title": "Hello",
            "description": null,
            "slug": { "current": "hello" },
            "body": null,
            "mainImage": null,
            "author": { "name": "Jane", "image": null },
            "comments": null
        });

        let post: Post = serde_json::from_value(value).unwrap();
        assert_eq!(post.id, "post-1");
        assert_eq!(post.slug(), "hello");
        assert!(post.description.is_none());
        assert!(post.body.is_empty());
        assert!(post.comments.is_empty());
        assert_eq!(post.author.unwrap().name, "Jane");
        assert!(post.created_at.is_some());
    }

    #[test]
    fn test_missing_or_null_timestamp_decodes() {
        let post: Post = serde_json::from_value(json!({
            "_id": "post-1",
            "title": "Undated",
            "slug": { "current": "undated" }
        }))
        .unwrap();
        assert!(post.created_at.is_none());

        let post: Post = serde_json::from_value(json!({
            "_id": "post-1",
            "_createdAt": null,
            "slug": { "current": "undated" }
        }))
        .unwrap();
        assert!(post.created_at.is_none());

        assert!(serde_json::from_value::<Post>(json!({
            "_id": "post-1",
            "_createdAt": "not a timestamp"
        }))
        .is_err());
    }

    #[test]
    fn test_reference_serializes_as_store_reference() {
        let value = serde_json::to_value(Reference::to("post-1")).unwrap();
        assert_eq!(value, json!({ "_type": "reference", "_ref": "post-1" }));
    }

    #[test]
    fn test_reference_without_type_decodes() {
        let r: Reference = serde_json::from_value(json!({ "_ref": "author-1" })).unwrap();
        assert_eq!(r.kind, "reference");
        assert_eq!(r.target, "author-1");
    }
}
