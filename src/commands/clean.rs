//! Clean the public directory

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::SiteConfig;

/// Remove exported pages of the site rooted at `base_dir`
pub fn run(base_dir: &Path) -> Result<()> {
    let config = SiteConfig::for_dir(base_dir)?;
    let public_dir = base_dir.join(&config.public_dir);

    if public_dir.exists() {
        fs::remove_dir_all(&public_dir)?;
        tracing::info!("Deleted: {:?}", public_dir);
    }

    Ok(())
}
