//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub url: String,

    // Generation
    /// Seconds a rendered page is served before it is regenerated
    pub revalidate: u64,
    /// Upper bound on pages rendered at once while prerendering
    pub prerender_concurrency: usize,

    // Directory
    pub public_dir: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Blog".to_string(),
            description: String::new(),
            url: "http://localhost:3000".to_string(),

            revalidate: 60,
            prerender_concurrency: 8,

            public_dir: "public".to_string(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load `_config.yml` from a site directory, or defaults when absent
    pub fn for_dir<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("_config.yml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Revalidation window for cached pages
    pub fn revalidate_window(&self) -> Duration {
        Duration::from_secs(self.revalidate)
    }

    /// Prerender concurrency, never below one
    pub fn concurrency(&self) -> usize {
        self.prerender_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.revalidate, 60);
        assert_eq!(config.revalidate_window(), Duration::from_secs(60));
        assert_eq!(config.public_dir, "public");
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
revalidate: 120
prerender_concurrency: 0
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.revalidate, 120);
        assert_eq!(config.concurrency(), 1);
        assert_eq!(config.public_dir, "public");
    }
}
