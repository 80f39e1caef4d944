//! Vision-model interaction: build the chat request and collect raw markup.
//!
//! This module is intentionally thin. All prompt engineering lives in
//! [`crate::prompts`]; everything downstream of the raw response lives in
//! [`crate::pipeline::sanitize`]. What remains here is the message layout,
//! the timeout, and the empty-response check.
//!
//! ## No retries
//!
//! One photographed question maps to exactly one model call. The call either
//! completes within [`crate::config::SketchConfig::api_timeout_secs`] or the
//! request fails atomically; transient-error recovery is the caller's choice,
//! not something hidden inside the pipeline.

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::config::SketchConfig;
use crate::error::SketchError;

/// The seam between the pipeline and whatever produces SVG markup.
///
/// Production uses [`VisionModel`] over a real provider; tests substitute a
/// canned implementation so the full request path runs without network access.
#[async_trait]
pub trait DiagramModel: Send + Sync {
    /// Produce raw diagram markup for one photographed question.
    async fn generate(&self, prompt: &str, image: ImageData) -> Result<String, SketchError>;
}

/// [`DiagramModel`] backed by a vision-capable LLM provider.
pub struct VisionModel {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl VisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &SketchConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl DiagramModel for VisionModel {
    /// ## Message Layout
    ///
    /// 1. **System message** — the drawing-rules prompt, with any caller
    ///    context already appended.
    /// 2. **User message** — the photograph as a base64 image attachment with
    ///    empty text. The empty user text is intentional: vision APIs require
    ///    at least one user turn, but the image carries all the content.
    async fn generate(&self, prompt: &str, image: ImageData) -> Result<String, SketchError> {
        let messages = vec![
            ChatMessage::system(prompt),
            ChatMessage::user_with_images("", vec![image]),
        ];

        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let start = Instant::now();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| SketchError::ModelCallFailed {
                message: e.to_string(),
            })?;
        debug!(
            "model call: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(response.content)
    }
}

/// Call the model with the configured timeout and reject empty output.
///
/// An empty or whitespace-only response means the model produced nothing
/// the sanitiser could work with; surfacing that as an explicit error beats
/// returning a placeholder diagram for a request that never drew anything.
pub async fn generate_markup(
    model: &dyn DiagramModel,
    prompt: &str,
    image: ImageData,
    timeout_secs: u64,
) -> Result<String, SketchError> {
    let raw = timeout(
        Duration::from_secs(timeout_secs),
        model.generate(prompt, image),
    )
    .await
    .map_err(|_| SketchError::ModelTimeout { secs: timeout_secs })??;

    if raw.trim().is_empty() {
        return Err(SketchError::EmptyModelResponse);
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    #[async_trait]
    impl DiagramModel for Canned {
        async fn generate(&self, _prompt: &str, _image: ImageData) -> Result<String, SketchError> {
            Ok(self.0.to_string())
        }
    }

    struct Stalled;

    #[async_trait]
    impl DiagramModel for Stalled {
        async fn generate(&self, _prompt: &str, _image: ImageData) -> Result<String, SketchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn image() -> ImageData {
        ImageData::new("aGVsbG8=", "image/png")
    }

    #[tokio::test]
    async fn empty_response_is_an_error() {
        let err = generate_markup(&Canned("   \n"), "p", image(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SketchError::EmptyModelResponse));
    }

    #[tokio::test]
    async fn markup_passes_through() {
        let raw = generate_markup(&Canned("<svg></svg>"), "p", image(), 5)
            .await
            .unwrap();
        assert_eq!(raw, "<svg></svg>");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_model_times_out() {
        let err = generate_markup(&Stalled, "p", image(), 2).await.unwrap_err();
        assert!(matches!(err, SketchError::ModelTimeout { secs: 2 }));
    }
}
