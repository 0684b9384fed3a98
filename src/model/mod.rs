//! Geometry and record types shared by the engine and the output layer.

mod manifest;
mod page;
mod rect;
mod region;
mod selection;

pub use manifest::{EmbeddedEntry, EmbeddedKey, ManifestEntry, RenderEntry, RenderKey};
pub use page::{ImagePlacement, LayoutLine, PageLayout};
pub use rect::{Rect, RectKey};
pub use region::{CaptionCandidate, CaptionKind, ClipFallback, ClipRegion, VisualKind, VisualRegion};
pub use selection::{PageSelection, SelectionTier};
