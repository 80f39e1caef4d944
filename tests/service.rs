//! Integration tests for the service boundary.
//!
//! These exercise the full request path (validation → model → sanitation →
//! rasterisation → response shape) against a canned [`DiagramModel`], so they
//! run offline with no API key. Live-model runs are covered by `e2e.rs`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sketchsolve::service::{
    generate_analysis, generate_sketch, ImageAttachment, SketchRequest,
};
use sketchsolve::{DiagramModel, ImageData, SketchConfig, SketchError};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Returns a fixed string and counts how often it was called.
struct CannedModel {
    response: String,
    calls: AtomicUsize,
}

impl CannedModel {
    fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagramModel for CannedModel {
    async fn generate(&self, _prompt: &str, _image: ImageData) -> Result<String, SketchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Always fails as if the provider rejected the call.
struct BrokenModel;

#[async_trait]
impl DiagramModel for BrokenModel {
    async fn generate(&self, _prompt: &str, _image: ImageData) -> Result<String, SketchError> {
        Err(SketchError::ModelCallFailed {
            message: "HTTP 500 from provider".to_string(),
        })
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

fn photo_bytes() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        32,
        32,
        image::Rgb([120, 120, 200]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .expect("in-memory JPEG encode");
    buf
}

fn request(content_type: &str) -> SketchRequest {
    SketchRequest {
        context: Some("solve question 2".to_string()),
        image: ImageAttachment {
            content_type: content_type.to_string(),
            filename: Some("question.jpg".to_string()),
            bytes: photo_bytes(),
        },
    }
}

const FENCED_SVG: &str = "```svg\n<svg width=\"1200\" height=\"800\" viewBox=\"0 0 1200 800\" \
xmlns=\"http://www.w3.org/2000/svg\"><rect x=\"0\" y=\"0\" width=\"1200\" height=\"800\" \
fill=\"#fff\"/><text x=\"40\" y=\"60\" font-size=\"24\">Answer: B</text></svg>\n```";

fn decode_image(b64: &str) -> image::DynamicImage {
    let bytes = STANDARD.decode(b64).expect("payload must be valid base64");
    image::load_from_memory(&bytes).expect("payload must decode as an image")
}

// ── Primary operation ────────────────────────────────────────────────────────

#[tokio::test]
async fn happy_path_returns_three_renditions() {
    let model = CannedModel::new(FENCED_SVG);
    let config = SketchConfig::default();

    let resp = generate_sketch(&request("image/jpeg"), &model, &config)
        .await
        .expect("valid request must not error");

    assert_eq!(resp.success, Some(true));
    assert!(resp.error.is_none());
    assert_eq!(model.call_count(), 1);

    // Fences are gone, sizing attributes are forced.
    assert!(resp.svg.starts_with("<svg"));
    assert!(!resp.svg.contains("```"));
    assert!(resp.svg.contains("width=\"100%\""));
    assert!(resp.svg.contains("xmlns=\"http://www.w3.org/2000/svg\""));

    // Both bitmap payloads decode to the preview canvas.
    use image::GenericImageView;
    assert_eq!(decode_image(&resp.jpg).dimensions(), (400, 300));
    assert_eq!(decode_image(&resp.png).dimensions(), (400, 300));
}

#[tokio::test]
async fn non_image_attachment_rejected_before_model_call() {
    let model = CannedModel::new(FENCED_SVG);
    let config = SketchConfig::default();

    let err = generate_sketch(&request("application/pdf"), &model, &config)
        .await
        .expect_err("non-image media type must propagate as a client error");

    assert!(err.is_client_error());
    assert_eq!(model.call_count(), 0, "model must not be consulted");
}

#[tokio::test]
async fn oversized_attachment_rejected() {
    let model = CannedModel::new(FENCED_SVG);
    let config = SketchConfig::builder()
        .max_image_bytes(16)
        .build()
        .unwrap();

    let err = generate_sketch(&request("image/jpeg"), &model, &config)
        .await
        .expect_err("oversized image must propagate as a client error");

    assert!(matches!(err, SketchError::ImageTooLarge { .. }));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn empty_model_response_becomes_failure_shape() {
    let model = CannedModel::new("   \n\t ");
    let config = SketchConfig::default();

    let resp = generate_sketch(&request("image/jpeg"), &model, &config)
        .await
        .expect("collaborator failures keep the response schema");

    assert!(resp.success.is_none());
    let err = resp.error.expect("diagnostic must be present");
    assert!(err.contains("empty"), "got: {err}");
    assert!(resp.svg.is_empty());
    assert!(resp.jpg.is_empty());
    assert!(resp.png.is_empty());
}

#[tokio::test]
async fn provider_failure_becomes_failure_shape() {
    let config = SketchConfig::default();

    let resp = generate_sketch(&request("image/jpeg"), &BrokenModel, &config)
        .await
        .expect("collaborator failures keep the response schema");

    assert!(resp.success.is_none());
    assert!(resp.error.unwrap().contains("HTTP 500"));
}

#[tokio::test]
async fn prose_response_still_yields_renderable_payloads() {
    // The model ignored instructions and answered in prose; the pipeline
    // must still return a displayable document and bitmaps.
    let model = CannedModel::new("The answer is B because the current doubles.");
    let config = SketchConfig::default();

    let resp = generate_sketch(&request("image/jpeg"), &model, &config)
        .await
        .expect("prose output must degrade, not fail");

    assert_eq!(resp.success, Some(true));
    assert!(resp.svg.contains("The answer is B"));
    decode_image(&resp.jpg);
    decode_image(&resp.png);
}

// ── Secondary operation ──────────────────────────────────────────────────────

#[tokio::test]
async fn analysis_envelope_on_success() {
    let model = CannedModel::new(FENCED_SVG);
    let config = SketchConfig::default();

    let resp = generate_analysis(&request("image/jpeg"), &model, &config)
        .await
        .expect("valid request must not error");

    assert!(resp.success);
    assert_eq!(resp.message, "Analysis complete");
    assert!(resp.error.is_none());
    let data = resp.data.expect("payload must be present on success");
    assert!(data.svg.starts_with("<svg"));
    assert!(!data.preview_image.is_empty());
    assert!(!data.png_image.is_empty());
}

#[tokio::test]
async fn analysis_envelope_on_failure() {
    let config = SketchConfig::default();

    let resp = generate_analysis(&request("image/jpeg"), &BrokenModel, &config)
        .await
        .expect("collaborator failures keep the response schema");

    assert!(!resp.success);
    assert_eq!(resp.message, "Analysis failed");
    assert!(resp.data.is_none());
    assert!(resp.error.unwrap().contains("HTTP 500"));
}

#[tokio::test]
async fn analysis_rejects_bad_attachment() {
    let model = CannedModel::new(FENCED_SVG);
    let config = SketchConfig::default();

    let err = generate_analysis(&request("text/html"), &model, &config)
        .await
        .expect_err("non-image media type must propagate");
    assert!(err.is_client_error());
    assert_eq!(model.call_count(), 0);
}

// ── Wire-shape stability ─────────────────────────────────────────────────────

#[tokio::test]
async fn primary_response_serialises_expected_fields() {
    let model = CannedModel::new(FENCED_SVG);
    let config = SketchConfig::default();

    let resp = generate_sketch(&request("image/jpeg"), &model, &config)
        .await
        .unwrap();
    let json = serde_json::to_value(&resp).unwrap();

    assert!(json.get("svg").is_some());
    assert!(json.get("jpg").is_some());
    assert!(json.get("png").is_some());
    assert_eq!(json["success"], true);
    assert!(json.get("error").is_none(), "error omitted on success");
}
