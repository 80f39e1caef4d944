//! End-to-end sketch generation entry points.
//!
//! [`generate_sketch`] resolves a provider and runs the full pipeline;
//! [`generate_with_model`] takes any [`DiagramModel`] so callers (and tests)
//! can supply their own. Both return a [`SketchOutput`] carrying the diagram
//! plus a timing breakdown.

use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::SketchConfig;
use crate::error::SketchError;
use crate::output::{SketchOutput, SketchStats};
use crate::pipeline::model::{generate_markup, DiagramModel, VisionModel};
use crate::pipeline::{encode, raster, sanitize};
use crate::prompts::{self, DEFAULT_SYSTEM_PROMPT};

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Generate an answer sketch for one photographed question.
///
/// Resolves a vision provider (see [`resolve_model`]) and delegates to
/// [`generate_with_model`].
///
/// # Arguments
/// * `context` — optional free-form hint appended to the system prompt
/// * `content_type` — declared media type of the photograph
/// * `image_bytes` — raw photograph bytes
pub async fn generate_sketch(
    context: Option<&str>,
    content_type: &str,
    image_bytes: &[u8],
    config: &SketchConfig,
) -> Result<SketchOutput, SketchError> {
    let model = resolve_model(config)?;
    generate_with_model(model.as_ref(), context, content_type, image_bytes, config).await
}

/// Generate an answer sketch using a caller-supplied model.
///
/// Pipeline order matters: the photograph is validated and encoded *before*
/// the model is called, so an unusable request never spends model tokens, and
/// an empty model response aborts before any rasterisation work.
pub async fn generate_with_model(
    model: &dyn DiagramModel,
    context: Option<&str>,
    content_type: &str,
    image_bytes: &[u8],
    config: &SketchConfig,
) -> Result<SketchOutput, SketchError> {
    let total_start = Instant::now();

    // ── Step 1: Validate and encode the photograph ───────────────────────
    let image = encode::encode_photo(content_type, image_bytes, config.max_image_bytes)?;

    // ── Step 2: Build the prompt ─────────────────────────────────────────
    let base = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let prompt = prompts::with_context(base, context);

    // ── Step 3: Call the vision model ────────────────────────────────────
    let model_start = Instant::now();
    let raw = generate_markup(model, &prompt, image, config.api_timeout_secs).await?;
    let model_duration_ms = model_start.elapsed().as_millis() as u64;
    debug!("model produced {} chars in {}ms", raw.len(), model_duration_ms);

    // ── Step 4: Sanitise and rasterise ───────────────────────────────────
    let raster_start = Instant::now();
    let clean = sanitize::sanitize(&raw);
    let diagram = raster::rasterize(&clean);
    let raster_duration_ms = raster_start.elapsed().as_millis() as u64;

    let total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "sketch generated: model {}ms, raster {}ms, total {}ms",
        model_duration_ms, raster_duration_ms, total_duration_ms
    );

    Ok(SketchOutput {
        diagram,
        stats: SketchStats {
            model_duration_ms,
            raster_duration_ms,
            total_duration_ms,
        },
    })
}

/// Resolve a [`DiagramModel`], from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is; handy in tests
///    or when the caller wraps the provider with custom middleware.
/// 2. **Named provider** (`config.provider_name`) — looked up through
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key from the environment.
/// 3. **Environment auto-detection** — `EDGEQUAKE_LLM_PROVIDER` +
///    `EDGEQUAKE_MODEL` when both are set, otherwise whatever
///    [`ProviderFactory::from_env`] finds.
pub fn resolve_model(config: &SketchConfig) -> Result<Box<VisionModel>, SketchError> {
    let provider = resolve_provider(config)?;
    Ok(Box::new(VisionModel::new(provider, config)))
}

fn resolve_provider(config: &SketchConfig) -> Result<Arc<dyn LLMProvider>, SketchError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SketchError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, SketchError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SketchError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::DiagramModel;
    use async_trait::async_trait;
    use edgequake_llm::ImageData;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    struct Canned(&'static str);

    #[async_trait]
    impl DiagramModel for Canned {
        async fn generate(&self, _prompt: &str, _image: ImageData) -> Result<String, SketchError> {
            Ok(self.0.to_string())
        }
    }

    fn photo() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn validation_runs_before_the_model() {
        // A wrong media type must fail without the model ever being called.
        struct Panicking;

        #[async_trait]
        impl DiagramModel for Panicking {
            async fn generate(&self, _: &str, _: ImageData) -> Result<String, SketchError> {
                panic!("model must not be called");
            }
        }

        let config = SketchConfig::default();
        let err = generate_with_model(&Panicking, None, "text/plain", &photo(), &config)
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn full_run_produces_all_three_payloads() {
        let svg = r#"```svg
<svg width="600" height="400" viewBox="0 0 600 400" xmlns="http://www.w3.org/2000/svg"/>
```"#;
        let config = SketchConfig::default();
        let out = generate_with_model(&Canned(svg), Some("question 2"), "image/png", &photo(), &config)
            .await
            .unwrap();

        assert!(out.diagram.svg.contains("<svg"));
        assert!(!out.diagram.svg.contains("```"));
        assert!(!out.diagram.preview_jpeg.is_empty());
        assert!(!out.diagram.lossless_png.is_empty());
    }
}
