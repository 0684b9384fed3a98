//! Storage boundary: artifact layout, file names and writers.

mod gallery;
mod metadata;
mod naming;
mod store;

pub use gallery::render_gallery;
pub use metadata::{generator, ImageSettings, RunMetadata};
pub use naming::{normalize_name, paper_title, safe_paper_name};
pub use store::ArtifactStore;

/// Artifact file names.
pub mod files {
    pub const METADATA: &str = "metadata.json";
    pub const FULLTEXT: &str = "fulltext.txt";
    pub const FIGURE_CAPTIONS: &str = "figure_captions.json";
    pub const TABLE_CAPTIONS: &str = "table_captions.json";
    pub const IMAGES_MANIFEST: &str = "images_manifest.json";
    pub const IMAGE_GALLERY: &str = "image_gallery.md";
}
