//! Rasterisation: sanitised SVG → preview JPEG + lossless PNG.
//!
//! ## Why two encodings?
//!
//! Mobile chat clients want a small opaque JPEG they can drop into a message
//! bubble without compositing; the PNG keeps the raw render (transparency
//! included) for full-fidelity display. Both are base64-wrapped so they can
//! travel inside a JSON response body.
//!
//! ## Failure model
//!
//! Raster conversion of untrusted generated markup is the most failure-prone
//! stage: unsupported filters, malformed numeric attributes, oversized
//! canvases. [`rasterize`] therefore never fails visibly:
//!
//! 1. render failure → both payloads become the same neutral-gray
//!    placeholder image, the document text is kept;
//! 2. placeholder encoding failure (should be impossible for an in-memory
//!    buffer) → all three fields degrade to empty strings.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Size, Tree};
use std::io::Cursor;
use tracing::{debug, error, warn};

use crate::output::DiagramSet;
use crate::pipeline::sanitize;

/// Fixed preview canvas, chosen for chat-bubble display.
pub const PREVIEW_WIDTH: u32 = 400;
pub const PREVIEW_HEIGHT: u32 = 300;

/// JPEG quality of the preview encoding.
pub const PREVIEW_JPEG_QUALITY: u8 = 85;

/// Placeholder tone and quality used on the render-failure path.
const PLACEHOLDER_GRAY: Rgb<u8> = Rgb([240, 240, 240]);
const PLACEHOLDER_JPEG_QUALITY: u8 = 75;

/// Convert a document into a [`DiagramSet`]. Never fails visibly.
///
/// The input is re-sanitised first: callers may invoke this directly with
/// markup that never went through the sanitiser, and the pass is idempotent
/// for markup that did.
pub fn rasterize(doc: &str) -> DiagramSet {
    let svg = sanitize::sanitize(doc);

    match render_bitmaps(&svg) {
        Ok((jpeg, png)) => DiagramSet {
            svg,
            preview_jpeg: STANDARD.encode(&jpeg),
            lossless_png: STANDARD.encode(&png),
        },
        Err(reason) => {
            warn!("render failed ({reason}); substituting placeholder bitmaps");
            match placeholder_jpeg() {
                Ok(bytes) => {
                    let b64 = STANDARD.encode(&bytes);
                    DiagramSet {
                        svg,
                        preview_jpeg: b64.clone(),
                        lossless_png: b64,
                    }
                }
                Err(e) => {
                    error!("placeholder encoding failed: {e}");
                    DiagramSet::empty()
                }
            }
        }
    }
}

/// Render the document onto the preview canvas and encode both payloads.
///
/// Returns `(jpeg_bytes, png_bytes)` where the JPEG is flattened onto white
/// and the PNG is the raw render with alpha intact.
fn render_bitmaps(svg: &str) -> Result<(Vec<u8>, Vec<u8>), String> {
    let mut opt = Options::default();
    if let Some(size) = Size::from_wh(1200.0, 800.0) {
        opt.default_size = size;
    }
    opt.fontdb_mut().load_system_fonts();

    let tree = Tree::from_str(svg, &opt).map_err(|e| format!("SVG parse: {e}"))?;

    let size = tree.size();
    if size.width() <= 0.0 || size.height() <= 0.0 {
        return Err(format!("degenerate canvas {}x{}", size.width(), size.height()));
    }

    let mut pixmap =
        Pixmap::new(PREVIEW_WIDTH, PREVIEW_HEIGHT).ok_or("pixmap allocation failed")?;

    // Scale each axis independently so the render fills the fixed canvas.
    let sx = PREVIEW_WIDTH as f32 / size.width();
    let sy = PREVIEW_HEIGHT as f32 / size.height();
    resvg::render(&tree, Transform::from_scale(sx, sy), &mut pixmap.as_mut());
    debug!(
        "rendered {}x{} document onto {}x{} preview",
        size.width(),
        size.height(),
        PREVIEW_WIDTH,
        PREVIEW_HEIGHT
    );

    let png = pixmap
        .encode_png()
        .map_err(|e| format!("PNG encode: {e}"))?;

    let flat = flatten_onto_white(&pixmap);
    let mut jpeg = Vec::new();
    flat.write_with_encoder(JpegEncoder::new_with_quality(
        &mut Cursor::new(&mut jpeg),
        PREVIEW_JPEG_QUALITY,
    ))
    .map_err(|e| format!("JPEG encode: {e}"))?;

    Ok((jpeg, png))
}

/// Composite the render onto an opaque white background.
///
/// Pixmap data is premultiplied RGBA, so white compositing reduces to
/// `channel + (255 - alpha)` per channel.
fn flatten_onto_white(pixmap: &Pixmap) -> RgbImage {
    let width = pixmap.width();
    let mut out = RgbImage::new(width, pixmap.height());
    for (i, px) in pixmap.pixels().iter().enumerate() {
        let inv = 255 - px.alpha();
        let x = i as u32 % width;
        let y = i as u32 / width;
        out.put_pixel(
            x,
            y,
            Rgb([
                px.red().saturating_add(inv),
                px.green().saturating_add(inv),
                px.blue().saturating_add(inv),
            ]),
        );
    }
    out
}

/// Encode the flat neutral-gray placeholder used when rendering fails.
fn placeholder_jpeg() -> Result<Vec<u8>, image::ImageError> {
    let img = RgbImage::from_pixel(PREVIEW_WIDTH, PREVIEW_HEIGHT, PLACEHOLDER_GRAY);
    let mut bytes = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(
        &mut Cursor::new(&mut bytes),
        PLACEHOLDER_JPEG_QUALITY,
    ))?;
    Ok(bytes)
}

// ── Tests ────────────────────────────────────────────────────────────────────
