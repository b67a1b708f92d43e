//! blogfront: a blog front end over a hosted document store
//!
//! Posts, authors and comments live in an external content store. This
//! crate queries them, renders post pages ahead of time, keeps those pages
//! fresh by time-based revalidation and accepts reader comments that stay
//! hidden until a moderator approves them.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod query;
pub mod server;
pub mod store;
pub mod submission;
pub mod templates;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::generator::{GenerateError, Generator};
use crate::helpers::ImageUrls;
use crate::query::QueryLayer;
use crate::store::ContentStore;
use crate::submission::SubmissionHandler;

/// The main blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
    /// Image URL builder for the configured project
    pub images: ImageUrls,
    store: Arc<dyn ContentStore>,
}

impl Blog {
    /// Create a new blog rooted at a directory, reading `_config.yml` if present
    pub fn new<P: AsRef<Path>>(
        base_dir: P,
        store: Arc<dyn ContentStore>,
        images: ImageUrls,
    ) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config = config::SiteConfig::for_dir(&base_dir)?;
        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            images,
            store,
        })
    }

    pub fn store(&self) -> Arc<dyn ContentStore> {
        self.store.clone()
    }

    pub fn queries(&self) -> QueryLayer {
        QueryLayer::new(self.store())
    }

    /// A page generator with an empty cache
    pub fn generator(&self) -> Result<Generator, GenerateError> {
        Generator::new(&self.config, self.store(), self.images.clone())
    }

    pub fn submissions(&self) -> SubmissionHandler {
        SubmissionHandler::new(self.store())
    }

    /// Render and export every page
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }
}
