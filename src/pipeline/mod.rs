//! The sketch-generation pipeline, one module per stage:
//!
//! ```text
//! path/URL ──▶ input ──▶ encode ──▶ model ──▶ sanitize ──▶ raster
//!  (CLI)      (bytes)   (base64)   (raw SVG)  (clean SVG)  (JPEG+PNG)
//! ```
//!
//! Stages communicate through plain values (bytes, strings, [`crate::output::DiagramSet`])
//! so each can be tested in isolation. The failure policy tightens as data
//! moves right: `input`/`encode`/`model` fail the request, while `sanitize`
//! and `raster` always produce *something* — by the time model output exists,
//! the user is owed a response body, however degraded.

pub mod encode;
pub mod input;
pub mod model;
pub mod raster;
pub mod sanitize;
