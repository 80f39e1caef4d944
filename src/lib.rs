//! # sketchsolve
//!
//! Turn photographed exam questions into annotated SVG answer sketches using
//! vision language models.
//!
//! ## Why this crate?
//!
//! Vision models are good at reading a photographed question and drawing an
//! explanatory diagram, but the SVG they emit is only *almost* valid: fenced
//! in markdown, missing namespaces, truncated mid-tag, littered with bare
//! ampersands. This crate owns everything around the model call — validating
//! the photograph, repairing the returned markup deterministically, and
//! rendering display-ready JPEG/PNG previews — so the caller always receives
//! a usable response body.
//!
//! ## Pipeline Overview
//!
//! ```text
//! photo
//!  │
//!  ├─ 1. Input     resolve local file or download from URL (CLI)
//!  ├─ 2. Encode    validate, RGB-convert, PNG → base64 ImageData
//!  ├─ 3. Model     one vision call (gemini / gpt / claude / …), no retries
//!  ├─ 4. Sanitize  fence stripping, root patching, tag closure, & escaping
//!  └─ 5. Raster    400×300 JPEG preview + PNG render, placeholder fallback
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sketchsolve::{generate_sketch, SketchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = SketchConfig::default();
//!     let photo = std::fs::read("question.jpg")?;
//!     let out = generate_sketch(None, "image/jpeg", &photo, &config).await?;
//!     std::fs::write("answer.svg", &out.diagram.svg)?;
//!     eprintln!("model: {}ms, total: {}ms",
//!         out.stats.model_duration_ms,
//!         out.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sketchsolve` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library in a server to avoid pulling in
//! CLI-only deps:
//! ```toml
//! sketchsolve = { version = "0.1", default-features = false }
//! ```
//!
//! ## Guarantees
//!
//! * [`pipeline::sanitize::sanitize`] never fails and is idempotent.
//! * [`pipeline::raster::rasterize`] never fails visibly; render errors
//!   degrade to a placeholder bitmap pair.
//! * The service response shapes in [`service`] keep their schema on every
//!   failure path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SketchConfig, SketchConfigBuilder, MAX_IMAGE_BYTES};
pub use error::SketchError;
pub use generate::{generate_sketch, generate_with_model, resolve_model, DEFAULT_MODEL};
pub use output::{DiagramSet, SketchOutput, SketchStats};
pub use pipeline::model::{DiagramModel, VisionModel};
pub use pipeline::sanitize::sanitize;

// Re-export the provider abstraction so callers can construct and inject
// their own without depending on edgequake-llm directly.
pub use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
