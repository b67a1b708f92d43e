//! Built-in page templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping stays on for every
//! `.html` template; only the pre-rendered post body is marked safe.

use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{portable, Post};
use crate::helpers::{post_path, summarize, ImageUrls};
use crate::submission::{CommentForm, ValidationError};

/// Result of the last comment submission, shown in place of the form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    #[default]
    NotSubmitted,
    Succeeded,
    Failed,
}

/// State of the comment form on a rendered page
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormView {
    pub outcome: SubmissionOutcome,
    pub values: CommentForm,
    pub errors: Vec<ValidationError>,
}

impl FormView {
    pub fn succeeded() -> Self {
        Self {
            outcome: SubmissionOutcome::Succeeded,
            ..Default::default()
        }
    }

    /// Store failure: keep the user's input so they can retry
    pub fn failed(values: CommentForm) -> Self {
        Self {
            outcome: SubmissionOutcome::Failed,
            values,
            errors: Vec::new(),
        }
    }

    /// Field validation failed; nothing was submitted
    pub fn invalid(values: CommentForm, errors: Vec<ValidationError>) -> Self {
        Self {
            outcome: SubmissionOutcome::NotSubmitted,
            values,
            errors,
        }
    }
}

/// Template renderer with embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteData,
    images: ImageUrls,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig, images: ImageUrls) -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("post.html", include_str!("site/post.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            ("unavailable.html", include_str!("site/unavailable.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/comment_form.html",
                include_str!("site/partials/comment_form.html"),
            ),
            (
                "partials/comments.html",
                include_str!("site/partials/comments.html"),
            ),
        ])?;

        Ok(Self {
            tera,
            site: SiteData {
                title: config.title.clone(),
                description: config.description.clone(),
                url: config.url.clone(),
            },
            images,
        })
    }

    /// Render a post page
    pub fn render_post(&self, post: &Post, form: &FormView) -> tera::Result<String> {
        let mut context = self.base_context();
        context.insert("post", &self.post_data(post));
        context.insert("form", form);
        self.tera.render("post.html", &context)
    }

    /// Render the not-found page for a request path
    pub fn render_not_found(&self, path: &str) -> tera::Result<String> {
        let mut context = self.base_context();
        context.insert("path", path);
        self.tera.render("not_found.html", &context)
    }

    /// Render the page shown when the store can't be reached
    pub fn render_unavailable(&self) -> tera::Result<String> {
        self.tera.render("unavailable.html", &self.base_context())
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context
    }

    fn post_data(&self, post: &Post) -> PostData {
        let author = post.author.clone().unwrap_or_default();
        PostData {
            id: post.id.clone(),
            path: post_path(post.slug()),
            title: post.title.clone(),
            description: post.description.clone().filter(|d| !d.is_empty()),
            summary: post
                .description
                .as_deref()
                .map(|d| summarize(d, 160))
                .unwrap_or_default(),
            published: post
                .created_at
                .map(|at| at.format("%B %-d, %Y").to_string()),
            main_image: post
                .main_image
                .as_ref()
                .and_then(|image| self.images.url_for(image)),
            author: AuthorData {
                name: if author.name.is_empty() {
                    "Anonymous".to_string()
                } else {
                    author.name
                },
                image: author.image.as_ref().and_then(|i| self.images.url_for(i)),
            },
            body_html: portable::to_html(&post.body, &self.images),
            comments: post
                .comments
                .iter()
                .map(|c| CommentData {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    comment: c.comment.clone(),
                })
                .collect(),
        }
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub id: String,
    pub path: String,
    pub title: String,
    pub description: Option<String>,
    pub summary: String,
    pub published: Option<String>,
    pub main_image: Option<String>,
    pub author: AuthorData,
    pub body_html: String,
    pub comments: Vec<CommentData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorData {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentData {
    pub id: String,
    pub name: String,
    pub comment: String,
}
