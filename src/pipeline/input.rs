//! Input resolution: normalise a user-supplied path or URL to image bytes.
//!
//! The service boundary receives photograph bytes with a declared media type,
//! but the CLI takes a file path or an HTTP(S) URL. This module bridges the
//! gap: it loads the bytes and sniffs the media type from the magic bytes
//! (camera exports routinely carry misleading extensions), falling back to
//! the transport-declared type for formats the sniffer does not know.

use image::ImageFormat;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::SketchError;

/// A photograph loaded from a path or URL, ready for the request boundary.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Filename portion of the original path or URL, when one exists.
    pub filename: Option<String>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to photograph bytes and a media type.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedImage, SketchError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input).await
    }
}

async fn resolve_local(path_str: &str) -> Result<ResolvedImage, SketchError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| SketchError::FileNotFound { path: path.clone() })?;

    let content_type = sniff_media_type(&bytes, None);
    debug!("resolved local image: {} ({content_type})", path.display());

    Ok(ResolvedImage {
        bytes,
        content_type,
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedImage, SketchError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SketchError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SketchError::DownloadFailed {
            url: url.to_string(),
            reason: if e.is_timeout() {
                format!("timed out after {timeout_secs}s")
            } else {
                e.to_string()
            },
        })?;

    if !response.status().is_success() {
        return Err(SketchError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let declared = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

    let filename = extract_filename(url);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SketchError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    let content_type = sniff_media_type(&bytes, declared.as_deref());
    info!("Downloaded {} bytes ({content_type})", bytes.len());

    Ok(ResolvedImage {
        bytes,
        content_type,
        filename,
    })
}

/// Determine the media type from magic bytes, falling back to the declared
/// transport type, then to a generic binary type that downstream validation
/// will reject.
fn sniff_media_type(bytes: &[u8], declared: Option<&str>) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return mime_for(format).to_string();
    }
    declared
        .filter(|d| !d.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}
