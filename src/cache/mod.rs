//! Page cache for time-based revalidation
//!
//! Each rendered page is stored with the time it was rendered. A page older
//! than the revalidation window is stale: it is still served, but the next
//! access schedules a regeneration. Regenerations of one slug are serialized
//! by a per-slug lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use crate::content::Post;

/// A rendered page and the post it was rendered from
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub post: Arc<Post>,
    pub html: Arc<str>,
    pub rendered_at: Instant,
}

impl CachedPage {
    /// Whether the page has outlived `window`
    pub fn is_stale(&self, window: Duration) -> bool {
        self.rendered_at.elapsed() >= window
    }
}

/// Rendered pages keyed by slug
pub struct PageCache {
    window: Duration,
    entries: RwLock<HashMap<String, CachedPage>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PageCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn get(&self, slug: &str) -> Option<CachedPage> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(slug)
            .cloned()
    }

    /// Store a freshly rendered page, stamped now
    pub fn insert(&self, slug: &str, post: Post, html: String) -> CachedPage {
        let page = CachedPage {
            post: Arc::new(post),
            html: Arc::from(html),
            rendered_at: Instant::now(),
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(slug.to_string(), page.clone());
        page
    }

    pub fn remove(&self, slug: &str) -> Option<CachedPage> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(slug)
    }

    pub fn is_stale(&self, page: &CachedPage) -> bool {
        page.is_stale(self.window)
    }

    /// Regeneration lock for one slug
    pub fn lock_for(&self, slug: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(slug.to_string())
            .or_default()
            .clone()
    }

    /// Drop the regeneration lock of a slug that has no cached page.
    ///
    /// The entry stays while anyone else still holds the lock, so callers
    /// must release their own handle first.
    pub fn release_lock(&self, slug: &str) {
        if self.get(slug).is_some() {
            return;
        }
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks.get(slug).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(slug);
        }
    }

    /// Number of slugs with a regeneration lock
    pub fn lock_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// All cached pages, sorted by slug
    pub fn snapshot(&self) -> Vec<(String, CachedPage)> {
        let mut pages: Vec<_> = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(slug, page)| (slug.clone(), page.clone()))
            .collect();
        pages.sort_by(|a, b| a.0.cmp(&b.0));
        pages
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post() -> Post {
        serde_json::from_value(json!({
            "_id": "post-1",
            "_createdAt": "2022-01-01T00:00:00Z",
            "title": "Hello",
            "slug": { "current": "hello" }
        }))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness_follows_window() {
        let cache = PageCache::new(Duration::from_secs(60));
        let page = cache.insert("hello", post(), "<p>v1</p>".to_string());
        assert!(!cache.is_stale(&page));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!cache.is_stale(&page));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.is_stale(&page));

        let page = cache.insert("hello", post(), "<p>v2</p>".to_string());
        assert!(!cache.is_stale(&page));
        assert_eq!(&*cache.get("hello").unwrap().html, "<p>v2</p>");
    }

    #[tokio::test]
    async fn test_lock_is_shared_per_slug() {
        let cache = PageCache::new(Duration::from_secs(60));
        let a = cache.lock_for("hello");
        let b = cache.lock_for("hello");
        let other = cache.lock_for("other");

        let _guard = a.lock().await;
        assert!(b.try_lock().is_err());
        assert!(other.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_release_lock() {
        let cache = PageCache::new(Duration::from_secs(60));

        let held = cache.lock_for("missing");
        cache.release_lock("missing");
        assert_eq!(cache.lock_count(), 1, "held locks are kept");

        drop(held);
        cache.release_lock("missing");
        assert_eq!(cache.lock_count(), 0);

        // Slugs with a cached page keep their lock
        cache.insert("hello", post(), String::new());
        drop(cache.lock_for("hello"));
        cache.release_lock("hello");
        assert_eq!(cache.lock_count(), 1);
    }

    #[test]
    fn test_remove_and_snapshot() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.insert("b", post(), String::new());
        cache.insert("a", post(), String::new());
        let slugs: Vec<_> = cache.snapshot().into_iter().map(|(s, _)| s).collect();
        assert_eq!(slugs, vec!["a", "b"]);

        assert!(cache.remove("a").is_some());
        assert!(cache.get("a").is_none());
        assert_eq!(cache.len(), 1);
    }
}
