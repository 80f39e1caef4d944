//! Attachment validation and encoding: photograph bytes → base64 `ImageData`.
//!
//! The boundary checks live here so they run before any model traffic:
//! a non-image media type or an oversized payload is rejected outright,
//! and undecodable bytes never reach the API. The accepted photograph is
//! down-converted to RGB (camera apps love RGBA and palette PNGs) and
//! re-encoded as PNG — lossless, so fine print in the photographed question
//! stays crisp for the vision model.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

use crate::error::SketchError;

/// Validate and encode an inbound photograph for the vision API.
///
/// # Errors
/// All failure modes are client errors ([`SketchError::is_client_error`]):
/// - media type not starting with `image/`
/// - payload above `max_bytes`
/// - bytes that no supported image decoder accepts
pub fn encode_photo(
    content_type: &str,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<ImageData, SketchError> {
    if !content_type.starts_with("image/") {
        return Err(SketchError::UnsupportedMediaType {
            content_type: content_type.to_string(),
        });
    }
    if bytes.len() > max_bytes {
        return Err(SketchError::ImageTooLarge {
            size_bytes: bytes.len(),
            limit_bytes: max_bytes,
        });
    }

    let img = image::load_from_memory(bytes).map_err(|e| SketchError::InvalidImage {
        reason: e.to_string(),
    })?;

    // Flatten any alpha/palette to plain RGB before re-encoding.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| SketchError::Internal(format!("photo re-encoding failed: {e}")))?;

    let b64 = STANDARD.encode(&buf);
    debug!("encoded photo → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
