//! Request/response shapes for the two service operations.
//!
//! These adapters are the outermost layer of the library: they own the JSON
//! wire shapes and the failure policy at the boundary. HTTP routing itself
//! lives with the embedding server; everything it needs (deserialisable
//! request, serialisable response, client-error classification) is here.
//!
//! ## Failure policy
//!
//! * Client errors (bad attachment) propagate as `Err` so the embedding
//!   server can answer with a 400-class status before any model traffic.
//! * Everything else degrades into the operation's structured failure shape:
//!   the response body keeps its schema even when generation collapses, so
//!   clients never have to parse two different error formats.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::SketchConfig;
use crate::error::SketchError;
use crate::generate::generate_with_model;
use crate::pipeline::model::DiagramModel;

/// One photographed exam question plus optional free-form context.
#[derive(Debug, Clone, Deserialize)]
pub struct SketchRequest {
    /// Extra instructions appended to the system prompt, e.g. which
    /// sub-question to answer.
    #[serde(default)]
    pub context: Option<String>,
    pub image: ImageAttachment,
}

/// The uploaded photograph.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageAttachment {
    /// Declared media type, e.g. "image/jpeg". Must start with `image/`.
    pub content_type: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(with = "serde_bytes_base64")]
    pub bytes: Vec<u8>,
}

/// Response of the primary operation: three renditions of one diagram.
///
/// On success `success` is `Some(true)` and `error` is absent. On a degraded
/// failure the same shape is returned with empty payload strings, `success`
/// omitted, and `error` carrying the diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SketchResponse {
    /// The sanitised SVG document.
    pub svg: String,
    /// Base64 JPEG preview, flattened onto white.
    pub jpg: String,
    /// Base64 PNG render.
    pub png: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SketchResponse {
    fn failure(message: String) -> Self {
        Self {
            svg: String::new(),
            jpg: String::new(),
            png: String::new(),
            success: None,
            error: Some(message),
        }
    }
}

/// Response of the secondary, envelope-style operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalysisData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload of a successful analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisData {
    pub svg: String,
    pub preview_image: String,
    pub png_image: String,
}

/// Primary operation: photograph in, three diagram renditions out.
///
/// # Errors
/// Only client errors ([`SketchError::is_client_error`]) are returned as
/// `Err`; all other failures come back as `Ok` with the structured failure
/// shape.
pub async fn generate_sketch(
    request: &SketchRequest,
    model: &dyn DiagramModel,
    config: &SketchConfig,
) -> Result<SketchResponse, SketchError> {
    match run(request, model, config).await? {
        Ok(out) => Ok(SketchResponse {
            svg: out.diagram.svg,
            jpg: out.diagram.preview_jpeg,
            png: out.diagram.lossless_png,
            success: Some(true),
            error: None,
        }),
        Err(e) => Ok(SketchResponse::failure(e.to_string())),
    }
}

/// Secondary operation: identical pipeline, envelope-style response.
pub async fn generate_analysis(
    request: &SketchRequest,
    model: &dyn DiagramModel,
    config: &SketchConfig,
) -> Result<AnalysisResponse, SketchError> {
    match run(request, model, config).await? {
        Ok(out) => Ok(AnalysisResponse {
            success: true,
            message: "Analysis complete".to_string(),
            data: Some(AnalysisData {
                svg: out.diagram.svg,
                preview_image: out.diagram.preview_jpeg,
                png_image: out.diagram.lossless_png,
            }),
            error: None,
        }),
        Err(e) => Ok(AnalysisResponse {
            success: false,
            message: "Analysis failed".to_string(),
            data: None,
            error: Some(e.to_string()),
        }),
    }
}

/// Shared pipeline run with the boundary's two-level error split:
/// outer `Err` for client errors, inner `Err` for degradable failures.
async fn run(
    request: &SketchRequest,
    model: &dyn DiagramModel,
    config: &SketchConfig,
) -> Result<Result<crate::output::SketchOutput, SketchError>, SketchError> {
    info!(
        "sketch request: {} bytes, type {}, context: {}",
        request.image.bytes.len(),
        request.image.content_type,
        request.context.is_some()
    );

    let result = generate_with_model(
        model,
        request.context.as_deref(),
        &request.image.content_type,
        &request.image.bytes,
        config,
    )
    .await;

    match result {
        Ok(out) => Ok(Ok(out)),
        Err(e) if e.is_client_error() => Err(e),
        Err(e) => {
            error!("sketch generation failed: {e}");
            Ok(Err(e))
        }
    }
}

/// Static health payload for liveness checks.
pub fn health() -> serde_json::Value {
    serde_json::json!({
        "status": "healthy",
        "service": "sketchsolve",
    })
}

/// Static service description for the root endpoint.
pub fn service_info() -> serde_json::Value {
    serde_json::json!({
        "message": "sketchsolve: photographed questions to answer sketches",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "generate_sketch": "photograph in, { svg, jpg, png } out",
            "generate_analysis": "photograph in, envelope with preview + png out",
        },
    })
}

/// Base64 (de)serialisation for the attachment bytes, so JSON requests carry
/// the photograph as a string field.
mod serde_bytes_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
