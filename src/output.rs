//! Output types returned by sketch generation.

use serde::{Deserialize, Serialize};

/// Three co-equal representations of one logical diagram.
///
/// When rendering succeeds all three depict the same visual content. When it
/// fails, `preview_jpeg` and `lossless_png` degrade to the same neutral
/// placeholder image and `svg` still holds the best-effort document — the
/// only case where `svg` is empty is a total rasteriser failure, where all
/// three fields are empty strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramSet {
    /// The sanitised SVG document, suitable for direct display.
    pub svg: String,
    /// Base64 of a 400×300 opaque JPEG for low-bandwidth preview.
    pub preview_jpeg: String,
    /// Base64 of the raw render as PNG, transparency preserved.
    pub lossless_png: String,
}

impl DiagramSet {
    /// The total-failure value: empty strings for all three fields.
    pub fn empty() -> Self {
        Self {
            svg: String::new(),
            preview_jpeg: String::new(),
            lossless_png: String::new(),
        }
    }
}

/// Timing breakdown for one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SketchStats {
    /// Wall-clock time of the vision-model call.
    pub model_duration_ms: u64,
    /// Wall-clock time of sanitation plus rasterisation.
    pub raster_duration_ms: u64,
    /// End-to-end request time.
    pub total_duration_ms: u64,
}

/// Result of a full generation run: the diagram plus timing stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SketchOutput {
    pub diagram: DiagramSet,
    pub stats: SketchStats,
}
