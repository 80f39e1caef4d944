//! Error types for the sketchsolve library.
//!
//! The taxonomy follows the recovery policy rather than the failure site:
//!
//! * **Client errors** — the submitted request is unusable (wrong media type,
//!   oversized or undecodable image). Surfaced immediately; never retried,
//!   never degraded. `is_client_error()` returns true for these so boundary
//!   adapters can map them to a 400-class rejection.
//!
//! * **Collaborator errors** — the vision model is unreachable, unconfigured,
//!   or returned nothing. Surfaced as a request failure with a diagnostic.
//!
//! Sanitation and rasterisation failures deliberately have **no variants
//! here**: those stages recover at the lowest layer by degrading their output
//! (placeholder document, placeholder bitmaps) instead of failing the request.

use thiserror::Error;

/// All errors that can abort a sketch request.
///
/// Degradable failures (malformed SVG, render errors) never appear here —
/// see [`crate::pipeline::sanitize`] and [`crate::pipeline::raster`].
#[derive(Debug, Error)]
pub enum SketchError {
    // ── Input validation (client) errors ─────────────────────────────────
    /// The attachment's media type does not start with `image/`.
    #[error("Attachment must be an image, got media type '{content_type}'")]
    UnsupportedMediaType { content_type: String },

    /// The attachment exceeds the configured size cap.
    #[error("Image too large: {size_bytes} bytes (limit {limit_bytes})")]
    ImageTooLarge { size_bytes: usize, limit_bytes: usize },

    /// The attachment bytes could not be decoded as an image.
    #[error("Could not decode image: {reason}")]
    InvalidImage { reason: String },

    // ── Input resolution errors (CLI path/URL inputs) ────────────────────
    /// Local input file was not found.
    #[error("Image file not found: '{path}'")]
    FileNotFound { path: std::path::PathBuf },

    /// HTTP URL was syntactically valid but the download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── Collaborator errors ──────────────────────────────────────────────
    /// No vision-model provider could be resolved (missing API key etc.).
    #[error("Vision model provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model API call failed.
    #[error("Vision model call failed: {message}")]
    ModelCallFailed { message: String },

    /// The model API call exceeded the configured timeout.
    #[error("Vision model call timed out after {secs}s")]
    ModelTimeout { secs: u64 },

    /// The model returned an empty response.
    #[error("Vision model returned an empty response")]
    EmptyModelResponse,

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SketchError {
    /// True when the caller submitted an unusable request (400-class).
    ///
    /// Everything else is a collaborator or internal failure (500-class).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SketchError::UnsupportedMediaType { .. }
                | SketchError::ImageTooLarge { .. }
                | SketchError::InvalidImage { .. }
                | SketchError::FileNotFound { .. }
        )
    }
}
