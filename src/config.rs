//! Configuration for sketch generation.
//!
//! All behaviour is controlled through [`SketchConfig`], built via its
//! [`SketchConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across requests and to diff two runs when their outputs
//! differ. Process-wide configuration (provider credentials, model choice) is
//! established once at startup and read-only thereafter; per-request state
//! never lives here.
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::SketchError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Maximum accepted size of an inbound photograph: 10 MiB.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for a sketch-generation run.
///
/// # Example
/// ```rust
/// use sketchsolve::SketchConfig;
///
/// let config = SketchConfig::builder()
///     .model("gemini-2.5-flash-image")
///     .max_tokens(8192)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SketchConfig {
    /// Vision model identifier, e.g. "gemini-2.5-flash-image", "gpt-4o".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// Provider name (e.g. "gemini", "openai", "anthropic").
    /// If None along with `provider`, auto-detects from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    /// Useful in tests or when the caller needs custom middleware.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the model completion. Default: 0.4.
    ///
    /// Diagram generation benefits from a little creativity in layout, but
    /// high temperatures produce broken coordinates and unbalanced markup
    /// more often, which shifts work onto the sanitizer.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    ///
    /// A full two-zone answer sketch routinely exceeds 4 000 output tokens of
    /// SVG. Setting this too low truncates the markup mid-element; the
    /// sanitizer will close the tags but the diagram loses content.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Per-model-call timeout in seconds. Default: 120.
    ///
    /// The model call dominates request latency. A request either completes
    /// within this window or fails atomically — there is no retry.
    pub api_timeout_secs: u64,

    /// Maximum accepted inbound image size in bytes. Default: [`MAX_IMAGE_BYTES`].
    pub max_image_bytes: usize,

    /// Download timeout for URL inputs in seconds (CLI only). Default: 60.
    pub download_timeout_secs: u64,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.4,
            max_tokens: 8192,
            system_prompt: None,
            api_timeout_secs: 120,
            max_image_bytes: MAX_IMAGE_BYTES,
            download_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for SketchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SketchConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish()
    }
}

impl SketchConfig {
    /// Create a new builder for `SketchConfig`.
    pub fn builder() -> SketchConfigBuilder {
        SketchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SketchConfig`].
#[derive(Debug)]
pub struct SketchConfigBuilder {
    config: SketchConfig,
}

impl SketchConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_image_bytes(mut self, bytes: usize) -> Self {
        self.config.max_image_bytes = bytes;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SketchConfig, SketchError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(SketchError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(SketchError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.max_image_bytes == 0 {
            return Err(SketchError::InvalidConfig(
                "max_image_bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
