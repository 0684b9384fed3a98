//! Run metadata record (`metadata.json`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::Capabilities;
use crate::model::SelectionTier;
use crate::options::{ExtractOptions, OutputLayout};

/// Options echoed back together with the decisions derived from them.
#[derive(Debug, Clone, Serialize)]
pub struct ImageSettings {
    #[serde(flatten)]
    pub options: ExtractOptions,
    pub render_pages_selected: Vec<u32>,
    pub selection_tier: Option<SelectionTier>,
    pub caption_queries_by_page: BTreeMap<u32, Vec<String>>,
}

/// Everything known about a run, written as `metadata.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub pdf_path: String,
    pub paper_title: String,
    pub bundle_name: String,
    pub num_pages: u32,
    pub prefix: String,
    pub layout: OutputLayout,
    pub output_dir: String,
    pub pdf_version: String,
    pub figure_caption_count: usize,
    pub table_caption_count: usize,
    pub image_settings: ImageSettings,
    /// Raw document info entries (`/Title`, `/Author`, ...)
    pub pdf_metadata: BTreeMap<String, String>,
    pub capabilities: Capabilities,
    pub generator: String,
    pub generated_at: DateTime<Utc>,
}

/// `paperfigs <version>`.
pub fn generator() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
