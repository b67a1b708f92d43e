//! Static page generator
//!
//! Pages are rendered ahead of time for every known slug and then served
//! from the page cache. A slug nobody rendered yet is generated on demand
//! while the request waits. A page past its revalidation window is served
//! as-is while one background task regenerates it, so newly approved
//! comments and edited posts show up without a full rebuild.

use anyhow::Result;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::{CachedPage, PageCache};
use crate::config::SiteConfig;
use crate::content::Post;
use crate::helpers::ImageUrls;
use crate::query::QueryLayer;
use crate::store::{ContentStore, StoreError};
use crate::templates::{FormView, TemplateRenderer};

/// Why a page couldn't be generated
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to render page: {0}")]
    Render(#[from] tera::Error),

    /// The render task panicked or was cancelled
    #[error("render task did not finish: {0}")]
    Aborted(String),
}

impl GenerateError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}

/// How a page was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// Cached and within the window
    Fresh,
    /// Cached, past the window; a regeneration was scheduled
    Stale,
    /// Rendered for this request
    Generated,
}

/// Outcome of a page request
#[derive(Debug, Clone)]
pub enum PageResponse {
    Page { page: CachedPage, served: Served },
    NotFound,
}

/// Result of rendering every known slug
#[derive(Debug, Default)]
pub struct PrerenderReport {
    pub rendered: Vec<String>,
    /// Listed, but gone by the time it was resolved
    pub missing: Vec<String>,
    pub failed: Vec<(String, GenerateError)>,
}

impl PrerenderReport {
    pub fn summary(&self) -> String {
        format!(
            "{} rendered, {} missing, {} failed",
            self.rendered.len(),
            self.missing.len(),
            self.failed.len()
        )
    }
}

struct Inner {
    queries: QueryLayer,
    renderer: TemplateRenderer,
    cache: PageCache,
    concurrency: usize,
}

/// Page generator backed by the query layer and the page cache
#[derive(Clone)]
pub struct Generator {
    inner: Arc<Inner>,
}

impl Generator {
    /// Create a new generator
    pub fn new(
        config: &SiteConfig,
        store: Arc<dyn ContentStore>,
        images: ImageUrls,
    ) -> Result<Self, GenerateError> {
        let renderer = TemplateRenderer::new(config, images)?;
        Ok(Self {
            inner: Arc::new(Inner {
                queries: QueryLayer::new(store),
                renderer,
                cache: PageCache::new(config.revalidate_window()),
                concurrency: config.concurrency(),
            }),
        })
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.inner.renderer
    }

    pub fn cache(&self) -> &PageCache {
        &self.inner.cache
    }

    /// Enumerate every slug and render all pages.
    ///
    /// A failing slug listing fails the run; a failing page is recorded in
    /// the report and the rest carry on.
    pub async fn prerender_all(&self) -> Result<PrerenderReport, StoreError> {
        let slugs = self.inner.queries.all_slugs().await?;
        tracing::info!("Prerendering {} pages", slugs.len());

        // Slugs whose task hasn't reported back. A task that panics never
        // does, so whatever is left at the end counts as failed.
        let mut outstanding: BTreeSet<String> = BTreeSet::new();
        let semaphore = Arc::new(Semaphore::new(self.inner.concurrency));
        let mut tasks = JoinSet::new();
        for entry in slugs {
            outstanding.insert(entry.slug.clone());
            let this = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = this.regenerate_locked(&entry.slug).await;
                (entry.slug, result)
            });
        }

        let mut report = PrerenderReport::default();
        let mut last_abort = String::new();
        while let Some(joined) = tasks.join_next().await {
            let (slug, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!("Prerender task failed: {}", e);
                    last_abort = e.to_string();
                    continue;
                }
            };
            outstanding.remove(&slug);
            match result {
                Ok(Some(_)) => {
                    tracing::debug!(slug = %slug, "Prerendered");
                    report.rendered.push(slug);
                }
                Ok(None) => {
                    tracing::warn!(slug = %slug, "Post disappeared while prerendering");
                    report.missing.push(slug);
                }
                Err(e) => {
                    tracing::error!(slug = %slug, error = %e, "Failed to prerender page");
                    report.failed.push((slug, e));
                }
            }
        }

        for slug in outstanding {
            self.inner.cache.release_lock(&slug);
            report
                .failed
                .push((slug, GenerateError::Aborted(last_abort.clone())));
        }

        report.rendered.sort();
        report.missing.sort();
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));
        tracing::info!("Prerender finished: {}", report.summary());
        Ok(report)
    }

    /// Serve the page for `slug`
    pub async fn page(&self, slug: &str) -> Result<PageResponse, GenerateError> {
        let cache = &self.inner.cache;

        if let Some(page) = cache.get(slug) {
            if cache.is_stale(&page) {
                self.spawn_revalidation(slug);
                return Ok(PageResponse::Page {
                    page,
                    served: Served::Stale,
                });
            }
            return Ok(PageResponse::Page {
                page,
                served: Served::Fresh,
            });
        }

        // First request for this slug: block on a fresh render. Concurrent
        // first requests wait on the same lock and reuse the result.
        let lock = cache.lock_for(slug);
        let guard = lock.lock().await;
        if let Some(page) = cache.get(slug) {
            return Ok(PageResponse::Page {
                page,
                served: Served::Fresh,
            });
        }
        let result = self.regenerate(slug).await;
        drop(guard);
        drop(lock);

        match result {
            Ok(Some(page)) => Ok(PageResponse::Page {
                page,
                served: Served::Generated,
            }),
            Ok(None) => {
                cache.release_lock(slug);
                Ok(PageResponse::NotFound)
            }
            Err(e) => {
                cache.release_lock(slug);
                Err(e)
            }
        }
    }

    /// Render a post with a given form state, bypassing the cache
    pub fn render_with_form(&self, post: &Post, form: &FormView) -> Result<String, GenerateError> {
        Ok(self.inner.renderer.render_post(post, form)?)
    }

    /// Write every cached page under `public_dir`.
    ///
    /// Pages land at `post/<slug>/index.html`; a `404.html` is written too.
    pub fn export(&self, public_dir: &Path) -> Result<usize> {
        fs::create_dir_all(public_dir)?;

        let mut written = 0;
        for (slug, page) in self.inner.cache.snapshot() {
            if !is_safe_segment(&slug) {
                tracing::warn!(slug = %slug, "Skipping slug that is not a safe file name");
                continue;
            }
            let output_path = public_dir.join("post").join(&slug).join("index.html");
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output_path, page.html.as_bytes())?;
            tracing::debug!("Generated: {:?}", output_path);
            written += 1;
        }

        let not_found = self.inner.renderer.render_not_found("/404")?;
        fs::write(public_dir.join("404.html"), not_found)?;

        Ok(written)
    }

    /// Regenerate one slug under its lock, releasing the lock if no page
    /// is left cached afterwards
    async fn regenerate_locked(&self, slug: &str) -> Result<Option<CachedPage>, GenerateError> {
        let lock = self.inner.cache.lock_for(slug);
        let guard = lock.lock().await;
        let result = self.regenerate(slug).await;
        drop(guard);
        drop(lock);
        self.inner.cache.release_lock(slug);
        result
    }

    /// Re-query and re-render one slug. The caller holds the slug's lock.
    async fn regenerate(&self, slug: &str) -> Result<Option<CachedPage>, GenerateError> {
        let cache = &self.inner.cache;
        let Some(post) = self.inner.queries.post_by_slug(slug).await? else {
            if cache.remove(slug).is_some() {
                tracing::info!(slug, "Post no longer exists, evicted cached page");
            }
            return Ok(None);
        };

        let html = self.inner.renderer.render_post(&post, &FormView::default())?;
        Ok(Some(cache.insert(slug, post, html)))
    }

    /// Start one background regeneration unless one is already running
    fn spawn_revalidation(&self, slug: &str) {
        let lock = self.inner.cache.lock_for(slug);
        let Ok(guard) = lock.try_lock_owned() else {
            tracing::debug!(slug, "Regeneration already in progress");
            return;
        };

        let this = self.clone();
        let slug = slug.to_string();
        tokio::spawn(async move {
            // Another regeneration may have finished between the stale read
            // and taking the lock.
            if let Some(page) = this.inner.cache.get(&slug) {
                if !this.inner.cache.is_stale(&page) {
                    return;
                }
            }
            let result = this.regenerate(&slug).await;
            drop(guard);
            match result {
                Ok(Some(_)) => tracing::debug!(slug = %slug, "Regenerated stale page"),
                // Evicted; its lock goes too.
                Ok(None) => this.inner.cache.release_lock(&slug),
                Err(e) => tracing::warn!(
                    slug = %slug,
                    error = %e,
                    "Regeneration failed, keeping stale page"
                ),
            }
        });
    }
}

/// Whether a slug can be used as a single directory name
fn is_safe_segment(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\', '\0'])
}
