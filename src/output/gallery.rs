//! Markdown image gallery.

use std::path::Path;

use crate::model::ManifestEntry;

/// Render the gallery for `entries`, linking images relative to `base`.
pub fn render_gallery(entries: &[ManifestEntry], base: &Path) -> String {
    let mut lines: Vec<String> = vec!["# Image Gallery".to_string(), String::new()];

    if entries.is_empty() {
        lines.push("No images extracted.".to_string());
        return lines.join("\n") + "\n";
    }

    for entry in entries {
        let page = entry.page();
        let index = entry.index();
        let crop_note = match entry {
            ManifestEntry::PageRender(render) => {
                let applied = if render.crop_applied { "(applied)" } else { "" };
                format!(" / crop={}{}", render.crop_mode, applied)
            }
            ManifestEntry::Embedded(_) => String::new(),
        };
        let rel = relative_path(entry.path(), base);

        lines.push(format!(
            "## Page {} / {} / Image {}{}",
            page,
            entry.source(),
            index,
            crop_note
        ));
        lines.push(format!("`{}`", rel));
        lines.push(format!("![page-{}-image-{}]({})", page, index, rel));
        lines.push(String::new());
    }

    lines.join("\n").trim_end().to_string() + "\n"
}

fn relative_path(path: &str, base: &Path) -> String {
    Path::new(path)
        .strip_prefix(base)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| path.to_string())
}
