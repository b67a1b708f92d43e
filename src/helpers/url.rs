//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::content::ImageRef;

/// Characters escaped in a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const IMAGE_CDN: &str = "https://cdn.sanity.io/images";

/// Builds public CDN URLs for image assets of one project/dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrls {
    project_id: String,
    dataset: String,
}

impl ImageUrls {
    pub fn new(project_id: &str, dataset: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            dataset: dataset.to_string(),
        }
    }

    /// CDN URL for an image field.
    ///
    /// Asset ids look like `image-<hash>-<w>x<h>-<ext>` and map to
    /// `<cdn>/<project>/<dataset>/<hash>-<w>x<h>.<ext>`. Anything else yields
    /// `None`.
    pub fn url_for(&self, image: &ImageRef) -> Option<String> {
        let id = image.asset_id()?.strip_prefix("image-")?;
        let (name, ext) = id.rsplit_once('-')?;
        if name.is_empty() || ext.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}/{}/{}.{}",
            IMAGE_CDN, self.project_id, self.dataset, name, ext
        ))
    }
}

/// Site-relative path of a post page
pub fn post_path(slug: &str) -> String {
    format!("/post/{}", utf8_percent_encode(slug, SEGMENT))
}
