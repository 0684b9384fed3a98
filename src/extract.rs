//! Extraction run orchestration.
//!
//! One [`Extractor::run`] opens the document, scans its text for captions,
//! selects pages, renders (cropped) pages, extracts embedded images and
//! writes every artifact. [`Extractor::plan`] performs the same decisions
//! without rendering or writing anything.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::engine::{
    clip_for_page, extract_embedded, render_page, select_pages, Capabilities, PdfiumRasterizer,
    RasterDocument, Rasterizer,
};
use crate::error::Result;
use crate::model::{
    ClipFallback, ClipRegion, EmbeddedEntry, ManifestEntry, PageLayout, PageSelection, Rect,
    RenderEntry, RenderKey,
};
use crate::options::{ExtractOptions, ImageMode};
use crate::output::{
    files, generator, normalize_name, paper_title, render_gallery, safe_paper_name, ArtifactStore,
    ImageSettings, RunMetadata,
};
use crate::parser::{DocumentInfo, LopdfBackend, PdfBackend};
use crate::scan::{CaptionLine, CaptionScan};

/// Names a run derives from the document and the options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunNames {
    pub paper_title: String,
    pub bundle_name: String,
    pub prefix: String,
}

impl RunNames {
    pub fn resolve(info: &DocumentInfo, pdf_path: &Path, options: &ExtractOptions) -> Self {
        let paper_title = paper_title(info.title.as_deref(), pdf_path);
        let bundle_name = match &options.bundle_name {
            Some(name) => safe_paper_name(name),
            None => safe_paper_name(&paper_title),
        };
        let prefix = normalize_name(options.prefix.as_deref().unwrap_or(&bundle_name));
        Self {
            paper_title,
            bundle_name,
            prefix,
        }
    }
}

/// Crop decision for one selected page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagePlan {
    pub page: u32,
    pub render_index: u32,
    pub queries: Vec<String>,
    pub caption_rect_count: usize,
    pub visual_count: usize,
    pub crop_applied: bool,
    /// Clip in page layout space (unrotated)
    pub clip_rect: Option<[f32; 4]>,
    /// The same clip in the rendered page's space, after `/Rotate`
    pub render_clip: Option<[f32; 4]>,
    pub fallback: Option<ClipFallback>,
}

impl PagePlan {
    /// Clip handed to the rasterizer.
    pub fn clip(&self) -> ClipRegion {
        match self.render_clip {
            Some([x0, y0, x1, y1]) => ClipRegion::Applied(Rect::new(x0, y0, x1, y1)),
            None => ClipRegion::NotApplied,
        }
    }
}

/// Decisions of a run, computed without rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionPlan {
    pub pdf_path: String,
    pub num_pages: u32,
    #[serde(flatten)]
    pub names: RunNames,
    pub figure_captions: Vec<CaptionLine>,
    pub table_captions: Vec<CaptionLine>,
    pub selection: Option<PageSelection>,
    pub pages: Vec<PagePlan>,
    /// Pages whose embedded images are skipped in hybrid mode
    pub embedded_skip_pages: Vec<u32>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub pdf_path: String,
    pub output_dir: PathBuf,
    #[serde(flatten)]
    pub names: RunNames,
    pub num_pages: u32,
    pub figure_caption_count: usize,
    pub table_caption_count: usize,
    pub selection: Option<PageSelection>,
    pub manifest: Vec<ManifestEntry>,
    pub capabilities: Capabilities,
}

impl ExtractionReport {
    /// Manifest entry counts keyed by `source`.
    pub fn images_by_source(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.manifest {
            *counts.entry(entry.source()).or_insert(0) += 1;
        }
        counts
    }

    /// Renders whose crop was applied.
    pub fn cropped_renders(&self) -> usize {
        self.manifest
            .iter()
            .filter(|e| matches!(e, ManifestEntry::PageRender(r) if r.crop_applied))
            .count()
    }
}

/// Runs figure extraction for PDF files.
pub struct Extractor {
    options: ExtractOptions,
    rasterizer: Option<Box<dyn Rasterizer>>,
}

impl Extractor {
    /// Create an extractor, binding PDFium for page renders when available.
    pub fn new(options: ExtractOptions) -> Self {
        let rasterizer = if options.image_mode.renders_pages() {
            PdfiumRasterizer::probe().map(|r| Box::new(r) as Box<dyn Rasterizer>)
        } else {
            None
        };
        Self {
            options,
            rasterizer,
        }
    }

    /// Create an extractor that never renders pages.
    pub fn without_rasterizer(options: ExtractOptions) -> Self {
        Self {
            options,
            rasterizer: None,
        }
    }

    /// Use a specific raster backend.
    pub fn with_rasterizer<R: Rasterizer + 'static>(mut self, rasterizer: R) -> Self {
        self.rasterizer = Some(Box::new(rasterizer));
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Whether a raster backend is bound.
    pub fn has_rasterizer(&self) -> bool {
        self.rasterizer.is_some()
    }

    /// Compute page selection and crop decisions without rendering.
    pub fn plan<P: AsRef<Path>>(&self, pdf_path: P) -> Result<ExtractionPlan> {
        self.options.validate()?;
        let pdf_path = pdf_path.as_ref();
        let backend = LopdfBackend::load_file(pdf_path)?;
        let names = RunNames::resolve(&backend.info(), pdf_path, &self.options);
        let scan = CaptionScan::scan(&backend);
        let queries_by_page = scan.queries_by_page();

        let selection = self.select(&backend, &scan);
        let pages: Vec<PagePlan> = selection
            .as_ref()
            .map(|s| {
                s.iter()
                    .enumerate()
                    .map(|(i, page)| self.plan_page(&backend, page, i as u32 + 1, &queries_by_page))
                    .collect()
            })
            .unwrap_or_default();
        let predicted_renders = match &selection {
            Some(selection) if self.has_rasterizer() => selection.pages.clone(),
            _ => Vec::new(),
        };
        let mut embedded_skip_pages: Vec<u32> = self
            .embedded_skip_pages(predicted_renders)
            .into_iter()
            .collect();
        embedded_skip_pages.sort_unstable();

        Ok(ExtractionPlan {
            pdf_path: pdf_path.display().to_string(),
            num_pages: backend.page_count(),
            names,
            figure_captions: scan.figures,
            table_captions: scan.tables,
            selection,
            pages,
            embedded_skip_pages,
        })
    }

    /// Run a full extraction into `output_dir`.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        pdf_path: P,
        output_dir: Q,
    ) -> Result<ExtractionReport> {
        self.options.validate()?;
        let pdf_path = absolute(pdf_path.as_ref());
        let backend = LopdfBackend::load_file(&pdf_path)?;
        let info = backend.info();
        let names = RunNames::resolve(&info, &pdf_path, &self.options);

        fs::create_dir_all(output_dir.as_ref())?;
        let output_dir = fs::canonicalize(output_dir.as_ref())?;
        let store = ArtifactStore::new(&output_dir, &names.bundle_name, &names.prefix, self.options.layout);
        store.prepare(self.options.clean)?;

        log::info!(
            "Extracting {} ({} pages) into {}",
            pdf_path.display(),
            backend.page_count(),
            store.run_dir().display()
        );

        let scan = CaptionScan::scan(&backend);
        let queries_by_page = scan.queries_by_page();
        let selection = self.select(&backend, &scan);

        let raster_doc = self.open_raster(&pdf_path);
        let capabilities = Capabilities {
            geometry: true,
            raster: raster_doc.is_some(),
        };

        let render_entries = match (&selection, &raster_doc) {
            (Some(selection), Some(doc)) => {
                self.render_pages(&backend, doc.as_ref(), selection, &queries_by_page, &store)?
            }
            _ => Vec::new(),
        };
        drop(raster_doc);

        let embedded_entries = if self.options.image_mode.extracts_embedded() {
            let skip = self.embedded_skip_pages(render_entries.iter().map(|r| r.page));
            self.save_embedded(&backend, &skip, &store)
        } else {
            Vec::new()
        };

        let manifest: Vec<ManifestEntry> = embedded_entries
            .into_iter()
            .map(ManifestEntry::Embedded)
            .chain(render_entries.into_iter().map(ManifestEntry::PageRender))
            .collect();

        let metadata = RunMetadata {
            pdf_path: pdf_path.display().to_string(),
            paper_title: names.paper_title.clone(),
            bundle_name: names.bundle_name.clone(),
            num_pages: backend.page_count(),
            prefix: names.prefix.clone(),
            layout: self.options.layout,
            output_dir: store.run_dir().display().to_string(),
            pdf_version: info.version.clone(),
            figure_caption_count: scan.figures.len(),
            table_caption_count: scan.tables.len(),
            image_settings: ImageSettings {
                options: self.options.clone(),
                render_pages_selected: selection.as_ref().map(|s| s.pages.clone()).unwrap_or_default(),
                selection_tier: selection.as_ref().map(|s| s.tier),
                caption_queries_by_page: queries_by_page,
            },
            pdf_metadata: info.entries.clone(),
            capabilities,
            generator: generator(),
            generated_at: Utc::now(),
        };

        store.write_text(files::FULLTEXT, &scan.fulltext())?;
        store.write_json(files::METADATA, &metadata)?;
        store.write_json(files::FIGURE_CAPTIONS, &scan.figures)?;
        store.write_json(files::TABLE_CAPTIONS, &scan.tables)?;
        store.write_json(files::IMAGES_MANIFEST, &manifest)?;
        let gallery_path = store.path_for(files::IMAGE_GALLERY);
        let gallery_base = gallery_path.parent().unwrap_or(store.run_dir()).to_path_buf();
        store.write_text(files::IMAGE_GALLERY, &render_gallery(&manifest, &gallery_base))?;

        let report = ExtractionReport {
            pdf_path: pdf_path.display().to_string(),
            output_dir: store.run_dir().to_path_buf(),
            names,
            num_pages: backend.page_count(),
            figure_caption_count: scan.figures.len(),
            table_caption_count: scan.tables.len(),
            selection,
            manifest,
            capabilities,
        };
        log::info!(
            "Done: {} images ({:?}), {} figure / {} table captions",
            report.manifest.len(),
            report.images_by_source(),
            report.figure_caption_count,
            report.table_caption_count
        );
        Ok(report)
    }

    fn select<B: PdfBackend + ?Sized>(&self, backend: &B, scan: &CaptionScan) -> Option<PageSelection> {
        if !self.options.image_mode.renders_pages() {
            return None;
        }
        let selection = select_pages(
            backend.page_count(),
            &scan.caption_pages(),
            self.options.figure_pages,
            self.options.max_captions_per_render_page,
        );
        log::debug!("Selected pages {:?} ({:?})", selection.pages, selection.tier);
        Some(selection)
    }

    /// Pages whose embedded images hybrid mode leaves to the page renders.
    fn embedded_skip_pages<I: IntoIterator<Item = u32>>(&self, rendered_pages: I) -> HashSet<u32> {
        if self.options.image_mode == ImageMode::Hybrid && !self.options.keep_embedded_on_rendered_pages {
            rendered_pages.into_iter().collect()
        } else {
            HashSet::new()
        }
    }

    fn open_raster(&self, pdf_path: &Path) -> Option<Box<dyn RasterDocument + '_>> {
        if !self.options.image_mode.renders_pages() {
            return None;
        }
        let rasterizer = self.rasterizer.as_ref()?;
        match rasterizer.open(pdf_path) {
            Ok(doc) => Some(doc),
            Err(e) => {
                log::warn!("Rasterizer cannot open {}: {}", pdf_path.display(), e);
                None
            }
        }
    }

    fn layout<B: PdfBackend + ?Sized>(&self, backend: &B, page: u32) -> Option<PageLayout> {
        match backend.page_layout(page) {
            Ok(layout) => Some(layout),
            Err(e) => {
                log::warn!("Page {}: layout unavailable: {}", page, e);
                None
            }
        }
    }

    fn plan_page<B: PdfBackend + ?Sized>(
        &self,
        backend: &B,
        page: u32,
        render_index: u32,
        queries_by_page: &BTreeMap<u32, Vec<String>>,
    ) -> PagePlan {
        let queries = queries_by_page.get(&page).cloned().unwrap_or_default();
        let layout = self.layout(backend, page);
        let outcome = clip_for_page(layout.as_ref(), &queries, &self.options);
        let render_clip = match (outcome.clip.rect(), layout.as_ref()) {
            (Some(rect), Some(layout)) => Some(layout.to_display(&rect).to_array()),
            _ => None,
        };
        PagePlan {
            page,
            render_index,
            queries,
            caption_rect_count: outcome.caption_rect_count,
            visual_count: outcome.visual_count,
            crop_applied: outcome.clip.is_applied(),
            clip_rect: outcome.clip.rect().map(|r| r.to_array()),
            render_clip,
            fallback: outcome.fallback,
        }
    }

    fn render_pages<B: PdfBackend + ?Sized>(
        &self,
        backend: &B,
        doc: &dyn RasterDocument,
        selection: &PageSelection,
        queries_by_page: &BTreeMap<u32, Vec<String>>,
        store: &ArtifactStore,
    ) -> Result<Vec<RenderEntry>> {
        let dpi = self.options.render_dpi;
        let mut entries = Vec::new();

        for (i, page) in selection.iter().enumerate() {
            if page == 0 || page > doc.page_count() {
                continue;
            }
            let plan = self.plan_page(backend, page, i as u32 + 1, queries_by_page);
            let clip = plan.clip();

            let image = match render_page(doc, page, &clip, &self.options) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("Page {}: render failed: {}", page, e);
                    continue;
                }
            };

            let key = RenderKey {
                page,
                dpi,
                cropped: clip.is_applied(),
            };
            let (path, size_bytes) = store.save_png(&key.file_name(store.prefix()), &image)?;

            entries.push(RenderEntry {
                page,
                render_index: plan.render_index,
                dpi,
                width: image.width(),
                height: image.height(),
                size_bytes,
                crop_mode: self.options.crop_mode,
                crop_applied: plan.crop_applied,
                caption_rect_count: plan.caption_rect_count,
                clip_rect: plan.clip_rect,
                path: path.display().to_string(),
            });
        }
        Ok(entries)
    }

    fn save_embedded<B: PdfBackend + ?Sized>(
        &self,
        backend: &B,
        skip: &HashSet<u32>,
        store: &ArtifactStore,
    ) -> Vec<EmbeddedEntry> {
        let mut entries = Vec::new();
        extract_embedded(backend, &self.options, skip, |item| {
            let (path, size_bytes) = store.save_png(&item.key.file_name(store.prefix()), &item.image.image)?;
            entries.push(EmbeddedEntry {
                page: item.key.page,
                image_index: item.key.index,
                xref: item.key.xref,
                ext: "png".to_string(),
                width: item.image.width(),
                height: item.image.height(),
                alpha: item.image.alpha,
                colorspace: item.image.colorspace.clone(),
                size_bytes,
                path: path.display().to_string(),
            });
            Ok(())
        });
        entries
    }
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_names_from_title() {
        let info = DocumentInfo {
            title: Some("Mapping the Fly Brain: A Connectome".to_string()),
            ..Default::default()
        };
        let names = RunNames::resolve(&info, Path::new("x.pdf"), &ExtractOptions::default());
        assert_eq!(names.paper_title, "Mapping the Fly Brain: A Connectome");
        assert_eq!(names.bundle_name, "Mapping the Fly Brain- A Connectome");
        assert_eq!(names.prefix, "mapping-the-fly-brain-a-connectome");
    }

    #[test]
    fn test_run_names_overrides() {
        let info = DocumentInfo::default();
        let options = ExtractOptions::new()
            .with_bundle_name("HELIX_NatComputSci")
            .with_prefix("Helix v2");
        let names = RunNames::resolve(&info, Path::new("/tmp/some paper.pdf"), &options);
        assert_eq!(names.paper_title, "some paper");
        assert_eq!(names.bundle_name, "HELIX_NatComputSci");
        assert_eq!(names.prefix, "helix-v2");
    }

    #[test]
    fn test_embedded_skip_pages() {
        let hybrid = Extractor::without_rasterizer(ExtractOptions::default());
        assert_eq!(hybrid.embedded_skip_pages([2, 5]), HashSet::from([2, 5]));
        assert!(hybrid.embedded_skip_pages(Vec::new()).is_empty());

        let keep = Extractor::without_rasterizer(ExtractOptions::new().keep_embedded_on_rendered_pages(true));
        assert!(keep.embedded_skip_pages([2, 5]).is_empty());

        let embedded = Extractor::without_rasterizer(ExtractOptions::new().with_image_mode(ImageMode::Embedded));
        assert!(embedded.embedded_skip_pages([2, 5]).is_empty());
    }

    #[test]
    fn test_report_counts() {
        let report = ExtractionReport {
            pdf_path: "a.pdf".to_string(),
            output_dir: PathBuf::from("/out"),
            names: RunNames {
                paper_title: "t".to_string(),
                bundle_name: "t".to_string(),
                prefix: "t".to_string(),
            },
            num_pages: 1,
            figure_caption_count: 0,
            table_caption_count: 0,
            selection: None,
            manifest: vec![ManifestEntry::PageRender(RenderEntry {
                page: 1,
                render_index: 1,
                dpi: 220,
                width: 1,
                height: 1,
                size_bytes: 1,
                crop_mode: crate::options::CropMode::CaptionAware,
                crop_applied: true,
                caption_rect_count: 1,
                clip_rect: Some([0.0, 0.0, 1.0, 1.0]),
                path: "x.png".to_string(),
            })],
            capabilities: Capabilities::default(),
        };
        assert_eq!(report.images_by_source().get("page_render"), Some(&1));
        assert_eq!(report.cropped_renders(), 1);
    }
}
