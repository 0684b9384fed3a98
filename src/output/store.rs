//! Artifact storage.
//!
//! Decides where every artifact of a run lands and writes it. In the
//! bundle layout a run owns `<output_dir>/<bundle_name>/` with images under
//! `images/`; in the flat layout files share `<output_dir>` and carry the
//! run prefix (`<prefix>_metadata.json`, `<prefix>_images/`).

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;

use crate::error::Result;
use crate::options::OutputLayout;

/// Writes the artifacts of one run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    layout: OutputLayout,
    prefix: String,
    run_dir: PathBuf,
    image_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(output_dir: &Path, bundle_name: &str, prefix: &str, layout: OutputLayout) -> Self {
        let (run_dir, image_dir) = match layout {
            OutputLayout::Bundle => {
                let run_dir = output_dir.join(bundle_name);
                let image_dir = run_dir.join("images");
                (run_dir, image_dir)
            }
            OutputLayout::Flat => (
                output_dir.to_path_buf(),
                output_dir.join(format!("{}_images", prefix)),
            ),
        };
        Self {
            layout,
            prefix: prefix.to_string(),
            run_dir,
            image_dir,
        }
    }

    /// Directory holding the run's files.
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Create the run directory, removing earlier artifacts first if asked.
    pub fn prepare(&self, clean: bool) -> Result<()> {
        if clean {
            self.clean()?;
        }
        fs::create_dir_all(&self.run_dir)?;
        Ok(())
    }

    /// Remove the artifacts a previous run with the same name left behind.
    ///
    /// Bundle layout removes the whole bundle directory; flat layout
    /// removes every `<prefix>_*` entry of the output directory.
    pub fn clean(&self) -> Result<()> {
        match self.layout {
            OutputLayout::Bundle => {
                if self.run_dir.exists() {
                    log::info!("Removing {}", self.run_dir.display());
                    fs::remove_dir_all(&self.run_dir)?;
                }
            }
            OutputLayout::Flat => {
                if !self.run_dir.exists() {
                    return Ok(());
                }
                let marker = format!("{}_", self.prefix);
                for entry in fs::read_dir(&self.run_dir)? {
                    let entry = entry?;
                    if !entry.file_name().to_string_lossy().starts_with(&marker) {
                        continue;
                    }
                    let path = entry.path();
                    let removed = if path.is_dir() {
                        fs::remove_dir_all(&path)
                    } else {
                        fs::remove_file(&path)
                    };
                    if let Err(e) = removed {
                        log::warn!("Failed to remove {}: {}", path.display(), e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Path of a named run artifact such as `metadata.json`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        match self.layout {
            OutputLayout::Bundle => self.run_dir.join(name),
            OutputLayout::Flat => self.run_dir.join(format!("{}_{}", self.prefix, name)),
        }
    }

    pub fn write_text(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path_for(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write pretty-printed JSON.
    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_text(name, &json)
    }

    /// Save an image as PNG under the image directory.
    ///
    /// Returns the written path and its size in bytes.
    pub fn save_png(&self, file_name: &str, image: &DynamicImage) -> Result<(PathBuf, u64)> {
        fs::create_dir_all(&self.image_dir)?;
        let path = self.image_dir.join(file_name);
        image.save_with_format(&path, image::ImageFormat::Png)?;
        let size = fs::metadata(&path)?.len();
        Ok((path, size))
    }
}
