//! CLI binary for sketchsolve.
//!
//! A thin shim over the library crate that maps CLI flags to `SketchConfig`,
//! runs one generation, and writes the results to disk or stdout.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Parser;
use sketchsolve::pipeline::input::resolve_input;
use sketchsolve::service::{generate_sketch, ImageAttachment, SketchRequest};
use sketchsolve::{resolve_model, SketchConfig};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Solve a photographed question, write sketch.svg / sketch.jpg / sketch.png
  sketchsolve photo.jpg

  # Choose the output basename and add solver context
  sketchsolve photo.jpg -o question3 --context "answer sub-question (b) only"

  # From a URL, JSON response body to stdout
  sketchsolve https://example.com/exam-photo.jpg --json

  # Use a specific model
  sketchsolve --model gemini-2.5-flash-image --provider gemini photo.jpg

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID

SETUP:
  1. Set an API key:  export GEMINI_API_KEY=...
  2. Run:             sketchsolve photo.jpg -o answer
"#;

/// Turn a photographed exam question into an annotated SVG answer sketch.
#[derive(Parser, Debug)]
#[command(
    name = "sketchsolve",
    version,
    about = "Turn photographed exam questions into annotated SVG answer sketches",
    long_about = "Send a photographed exam question to a vision model and receive a repaired, \
mobile-ready SVG answer sketch plus JPEG/PNG renders. Supports Gemini, OpenAI, Anthropic, and \
any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image file path or HTTP/HTTPS URL.
    input: String,

    /// Output basename; writes <name>.svg, <name>.jpg, and <name>.png.
    #[arg(short, long, env = "SKETCHSOLVE_OUTPUT", default_value = "sketch")]
    output: PathBuf,

    /// Extra instructions for the solver, e.g. which sub-question to answer.
    #[arg(long, env = "SKETCHSOLVE_CONTEXT")]
    context: Option<String>,

    /// Vision model ID (e.g. gemini-2.5-flash-image, gpt-4o).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SKETCHSOLVE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max model output tokens.
    #[arg(long, env = "SKETCHSOLVE_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Model temperature (0.0-2.0).
    #[arg(long, env = "SKETCHSOLVE_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Model call timeout in seconds.
    #[arg(long, env = "SKETCHSOLVE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, env = "SKETCHSOLVE_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Print the JSON response body to stdout instead of writing files.
    #[arg(long, env = "SKETCHSOLVE_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SKETCHSOLVE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SKETCHSOLVE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Resolve the photograph ───────────────────────────────────────────
    let resolved = resolve_input(&cli.input, cli.download_timeout)
        .await
        .context("Failed to load the input image")?;

    // ── Build config and model ───────────────────────────────────────────
    let config = build_config(&cli).await?;
    let model = resolve_model(&config).context("No vision model available")?;

    let request = SketchRequest {
        context: cli.context.clone(),
        image: ImageAttachment {
            content_type: resolved.content_type,
            filename: resolved.filename,
            bytes: resolved.bytes,
        },
    };

    // ── Generate ─────────────────────────────────────────────────────────
    let response = generate_sketch(&request, model.as_ref(), &config)
        .await
        .context("Sketch generation failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to serialise response")?
        );
        return Ok(());
    }

    if let Some(ref err) = response.error {
        anyhow::bail!("generation failed: {err}");
    }

    // ── Write the three renditions ───────────────────────────────────────
    let svg_path = cli.output.with_extension("svg");
    tokio::fs::write(&svg_path, &response.svg)
        .await
        .with_context(|| format!("Failed to write {}", svg_path.display()))?;

    let jpg_path = cli.output.with_extension("jpg");
    write_base64(&jpg_path, &response.jpg).await?;

    let png_path = cli.output.with_extension("png");
    write_base64(&png_path, &response.png).await?;

    if !cli.quiet {
        eprintln!(
            "✔ wrote {}, {}, {}",
            svg_path.display(),
            jpg_path.display(),
            png_path.display()
        );
    }
    Ok(())
}

async fn write_base64(path: &PathBuf, b64: &str) -> Result<()> {
    let bytes = STANDARD
        .decode(b64)
        .with_context(|| format!("Invalid base64 payload for {}", path.display()))?;
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Map CLI args to `SketchConfig`.
async fn build_config(cli: &Cli) -> Result<SketchConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = SketchConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
