//! Generate static files

use anyhow::{bail, Result};

use crate::Blog;

/// Render every post and write the pages under the public directory
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = blog.generator()?;
    let report = generator.prerender_all().await?;
    let written = generator.export(&blog.public_dir)?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} pages in {:.2}s",
        written,
        duration.as_secs_f64()
    );

    for slug in &report.missing {
        tracing::warn!(slug = %slug, "Listed post could not be found");
    }
    if !report.failed.is_empty() {
        for (slug, error) in &report.failed {
            eprintln!("  /post/{}: {}", slug, error);
        }
        bail!("{} pages failed to generate", report.failed.len());
    }

    Ok(())
}
