//! Image resources consumed by the image rule
//!
//! Loading pixels is the embedder's business; the parser only needs a
//! name lookup that reports the natural size of an image.

use std::collections::HashMap;

/// An image found by a [`ResourceLoader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    /// Name the image was looked up by
    pub name: String,
    /// Natural width in points
    pub width: u32,
    /// Natural height in points
    pub height: u32,
}

impl ImageResource {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }
}

/// Named-resource lookup used by the image rule
pub trait ResourceLoader: Send + Sync {
    /// Look up an image by name, `None` if it does not exist
    fn load_image(&self, name: &str) -> Option<ImageResource>;
}

/// Loader that never finds anything; images fall back to alt text
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceLoader for NoResources {
    fn load_image(&self, _name: &str) -> Option<ImageResource> {
        None
    }
}

impl ResourceLoader for HashMap<String, ImageResource> {
    fn load_image(&self, name: &str) -> Option<ImageResource> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_resources() {
        assert_eq!(NoResources.load_image("logo.png"), None);
    }

    #[test]
    fn test_map_loader() {
        let mut images = HashMap::new();
        images.insert("logo.png".to_string(), ImageResource::new("logo.png", 32, 16));
        assert_eq!(images.load_image("logo.png").map(|i| i.width), Some(32));
        assert_eq!(images.load_image("other.png"), None);
    }
}
