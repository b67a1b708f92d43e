//! In-process document store

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use super::{ContentStore, StoreError};
use crate::content::{moderation, Comment, ModerationState, NewComment};
use crate::query::Query;

/// Documents held in memory, queried with the same semantics as the hosted
/// store
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Value>>,
    unreachable: AtomicBool,
    fetches: AtomicUsize,
    next_id: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<Value>) -> Self {
        Self {
            documents: RwLock::new(documents),
            ..Default::default()
        }
    }

    /// Load a dataset export: either a JSON array or one document per line
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {:?}", path))?;

        let documents: Vec<Value> = if content.trim_start().starts_with('[') {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse fixture {:?}", path))?
        } else {
            content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .enumerate()
                .map(|(n, line)| {
                    serde_json::from_str(line)
                        .with_context(|| format!("Failed to parse {:?} line {}", path, n + 1))
                })
                .collect::<Result<_>>()?
        };

        tracing::info!("Loaded {} documents from {:?}", documents.len(), path);
        Ok(Self::with_documents(documents))
    }

    /// Simulate the store going away (or coming back)
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of read queries served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Moderator approval of a comment. Returns false for unknown ids.
    pub fn approve(&self, comment_id: &str) -> bool {
        let mut documents = self.write();
        match documents
            .iter_mut()
            .find(|doc| doc_type(doc) == Some("comment") && doc_id(doc) == Some(comment_id))
        {
            Some(doc) => {
                let state = ModerationState::from_flag(doc.get("approved")).approve();
                doc["approved"] = Value::Bool(state.is_approved());
                true
            }
            None => false,
        }
    }

    /// Insert or replace a document by `_id`
    pub fn upsert(&self, document: Value) {
        let mut documents = self.write();
        let id = doc_id(&document).map(str::to_string);
        match documents.iter_mut().find(|d| id.is_some() && doc_id(d) == id.as_deref()) {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
    }

    /// Copies of all documents of one type, in insertion order
    pub fn documents_of_type(&self, kind: &str) -> Vec<Value> {
        self.read()
            .iter()
            .filter(|doc| doc_type(doc) == Some(kind))
            .cloned()
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Value>> {
        self.documents.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Value>> {
        self.documents.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }

    fn post_by_slug(&self, slug: &str) -> Value {
        let documents = self.read();
        let Some(post) = documents.iter().find(|doc| {
            doc_type(doc) == Some("post")
                && doc.pointer("/slug/current").and_then(Value::as_str) == Some(slug)
        }) else {
            return Value::Null;
        };

        let post_id = doc_id(post).unwrap_or_default();

        let author = post
            .pointer("/author/_ref")
            .and_then(Value::as_str)
            .and_then(|author_id| {
                documents
                    .iter()
                    .find(|doc| doc_type(doc) == Some("author") && doc_id(doc) == Some(author_id))
            })
            .map(|author| {
                json!({
                    "name": field(author, "name"),
                    "image": field(author, "image"),
                })
            })
            .unwrap_or(Value::Null);

        // post._ref == ^._id && approved == true
        let comments: Vec<Value> = documents
            .iter()
            .filter(|doc| doc_type(doc) == Some("comment"))
            .filter(|doc| {
                serde_json::from_value::<Comment>((*doc).clone())
                    .map(|c| moderation::is_visible_on(&c, post_id))
                    .unwrap_or(false)
            })
            .map(|doc| {
                json!({
                    "_id": field(doc, "_id"),
                    "name": field(doc, "name"),
                    "comment": field(doc, "comment"),
                    "post": field(doc, "post"),
                    "approved": field(doc, "approved"),
                })
            })
            .collect();

        json!({
            "_id": field(post, "_id"),
            "_createdAt": field(post, "_createdAt"),
            "title": field(post, "title"),
            "description": field(post, "description"),
            "slug": field(post, "slug"),
            "mainImage": field(post, "mainImage"),
            "body": field(post, "body"),
            "author": author,
            "comments": comments,
        })
    }

    fn post_slugs(&self) -> Value {
        let documents = self.read();
        let mut rows: Vec<Value> = documents
            .iter()
            .filter(|doc| doc_type(doc) == Some("post"))
            .map(|doc| {
                json!({
                    "_id": field(doc, "_id"),
                    "slug": doc
                        .get("slug")
                        .filter(|s| s.is_object())
                        .map(|s| json!({ "current": field(s, "current") }))
                        .unwrap_or(Value::Null),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            let key = |v: &Value| {
                v.pointer("/slug/current")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            key(a).cmp(&key(b))
        });
        Value::Array(rows)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch(&self, query: &Query) -> Result<Value, StoreError> {
        self.check_reachable()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(match query {
            Query::PostBySlug { slug } => self.post_by_slug(slug),
            Query::PostSlugs => self.post_slugs(),
        })
    }

    async fn create(&self, document: &NewComment) -> Result<String, StoreError> {
        self.check_reachable()?;

        let mut fields: Map<String, Value> = match serde_json::to_value(document) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => return Err(StoreError::Decode("document is not an object".to_string())),
            Err(e) => return Err(StoreError::Decode(e.to_string())),
        };

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("comment-{:06}", n);
        fields.insert("_id".to_string(), Value::String(id.clone()));
        fields.insert(
            "_createdAt".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );

        self.write().push(Value::Object(fields));
        Ok(id)
    }
}

fn doc_type(doc: &Value) -> Option<&str> {
    doc.get("_type").and_then(Value::as_str)
}

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}

/// Projected field: missing fields project as `null`
fn field(doc: &Value, name: &str) -> Value {
    doc.get(name).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_create_leaves_comment_pending() {
        let store = MemoryStore::new();
        let id = store
            .create(&NewComment::new("post-1", "Alice", "a@x.com", "Nice post!"))
            .await
            .unwrap();

        let comments = store.documents_of_type("comment");
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["_id"], json!(id));
        assert_eq!(comments[0]["post"]["_ref"], json!("post-1"));
        assert!(comments[0].get("approved").is_none());

        assert!(store.approve(&id));
        assert_eq!(store.documents_of_type("comment")[0]["approved"], json!(true));
        assert!(!store.approve("missing"));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let store = MemoryStore::new();
        store.set_unreachable(true);
        assert!(store.fetch(&Query::PostSlugs).await.is_err());
        assert!(store
            .create(&NewComment::new("p", "n", "e@x", "c"))
            .await
            .is_err());
        assert!(store.documents_of_type("comment").is_empty());
    }

    #[test]
    fn test_load_ndjson_fixture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"_id":"post-1","_type":"post","slug":{{"current":"a"}}}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"_id":"author-1","_type":"author","name":"Jane"}}"#).unwrap();

        let store = MemoryStore::from_file(file.path()).unwrap();
        assert_eq!(store.documents_of_type("post").len(), 1);
        assert_eq!(store.documents_of_type("author").len(), 1);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let store = MemoryStore::new();
        store.upsert(json!({ "_id": "post-1", "_type": "post", "title": "Old" }));
        store.upsert(json!({ "_id": "post-1", "_type": "post", "title": "New" }));
        let posts = store.documents_of_type("post");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["title"], json!("New"));
    }
}
