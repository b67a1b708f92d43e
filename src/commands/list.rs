//! List posts known to the content store

use anyhow::Result;

use crate::content::PostSlug;
use crate::Blog;

/// Print every post's slug and id
pub async fn run(blog: &Blog) -> Result<()> {
    let slugs = blog.queries().all_slugs().await?;

    println!("Posts ({}):", slugs.len());
    for line in format_listing(&slugs) {
        println!("{}", line);
    }

    Ok(())
}

fn format_listing(slugs: &[PostSlug]) -> Vec<String> {
    slugs
        .iter()
        .map(|entry| format!("  /post/{} [{}]", entry.slug, entry.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_listing() {
        let slugs = vec![
            PostSlug {
                slug: "a-post".to_string(),
                id: "post-2".to_string(),
            },
            PostSlug {
                slug: "hello".to_string(),
                id: "post-1".to_string(),
            },
        ];
        assert_eq!(
            format_listing(&slugs),
            vec!["  /post/a-post [post-2]", "  /post/hello [post-1]"]
        );
    }
}
