//! Shared image-attachment handling (spec.md §4.6.5): a turn's images arrive
//! as either a local path or base64 bytes, and every adapter that accepts
//! them normalizes through the same decode/size-guard/temp-file logic.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// One image attachment for a turn, in whichever shape the caller supplied
/// it. Exactly one of `path`, `base64_data`, or a `data:` URL in `url`
/// should be set; the others are `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageInput {
    /// A local filesystem path, forwarded to the provider as-is.
    pub path: Option<String>,
    /// Raw base64-encoded image bytes.
    pub base64_data: Option<String>,
    /// A `data:image/...;base64,...` URL, or a remote URL (not fetched).
    pub url: Option<String>,
    /// Declared MIME type, e.g. `"image/png"`.
    pub mime_type: Option<String>,
}

impl ImageInput {
    fn raw_base64(&self) -> Option<&str> {
        if let Some(b64) = self.base64_data.as_deref() {
            return Some(b64);
        }
        let url = self.url.as_deref()?;
        if url.starts_with("data:") {
            return url.split_once(',').map(|(_, data)| data);
        }
        None
    }

    fn extension(&self) -> &'static str {
        let mime = self.mime_type.as_deref().unwrap_or("");
        if mime.contains("jpeg") || mime.contains("jpg") {
            ".jpg"
        } else if mime.contains("gif") {
            ".gif"
        } else if mime.contains("webp") {
            ".webp"
        } else {
            ".png"
        }
    }
}

/// Resolved form of an image ready to hand to a provider.
pub enum ResolvedImage {
    /// A path the provider can read directly (either supplied or a
    /// freshly-written temp file from decoded base64).
    Path(PathBuf),
    /// Base64 bytes plus MIME type, for providers that accept inline image
    /// parts (e.g. Gemini's ACP prompt content).
    Inline { mime_type: String, base64_data: String },
}

/// Resolves one image input to a form a provider can consume: a supplied
/// path passes through unchanged; base64/data-url input decodes in place
/// (size-guarded) and is returned inline, ready for a provider that accepts
/// inline image parts. Returns `None` (with a logged warning) if the input
/// is empty, oversized, or fails to decode.
pub fn resolve_inline(image: &ImageInput) -> Option<ResolvedImage> {
    if let Some(path) = image.path.as_deref() {
        return Some(ResolvedImage::Path(PathBuf::from(path)));
    }

    let b64 = image.raw_base64()?;
    let approx_bytes = (b64.len() * 3) / 4;
    if approx_bytes > MAX_IMAGE_BYTES {
        tracing::warn!(approx_bytes, "skipping image attachment over 10MB");
        return None;
    }

    if base64::engine::general_purpose::STANDARD.decode(b64).is_err() {
        tracing::warn!("failed to decode attached image");
        return None;
    }

    Some(ResolvedImage::Inline {
        mime_type: image.mime_type.clone().unwrap_or_else(|| "image/png".to_string()),
        base64_data: b64.to_string(),
    })
}

/// Writes decoded image bytes to a fresh temp file with an extension
/// matching the declared MIME type, returning its path.
///
/// # Errors
/// Returns an I/O error if the temp file cannot be created or written.
pub async fn write_temp_file(image: &ImageInput) -> std::io::Result<Option<PathBuf>> {
    let Some(b64) = image.raw_base64() else {
        return Ok(None);
    };
    let approx_bytes = (b64.len() * 3) / 4;
    if approx_bytes > MAX_IMAGE_BYTES {
        tracing::warn!(approx_bytes, "skipping image attachment over 10MB");
        return Ok(None);
    }

    let bytes = match base64::engine::general_purpose::STANDARD.decode(b64) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "failed to decode attached image");
            return Ok(None);
        }
    };

    let path = std::env::temp_dir().join(format!("{}{}", uuid::Uuid::new_v4(), image.extension()));
    tokio::fs::write(&path, &bytes).await?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_declared_mime() {
        let mut img = ImageInput { mime_type: Some("image/jpeg".to_string()), ..Default::default() };
        assert_eq!(img.extension(), ".jpg");
        img.mime_type = Some("image/webp".to_string());
        assert_eq!(img.extension(), ".webp");
        img.mime_type = None;
        assert_eq!(img.extension(), ".png");
    }

    #[test]
    fn raw_base64_prefers_explicit_field_over_data_url() {
        let img = ImageInput {
            base64_data: Some("AAA".to_string()),
            url: Some("data:image/png;base64,BBB".to_string()),
            ..Default::default()
        };
        assert_eq!(img.raw_base64(), Some("AAA"));
    }

    #[test]
    fn raw_base64_extracts_from_data_url() {
        let img = ImageInput {
            url: Some("data:image/png;base64,BBB".to_string()),
            ..Default::default()
        };
        assert_eq!(img.raw_base64(), Some("BBB"));
    }

    #[tokio::test]
    async fn oversized_base64_is_rejected() {
        let huge = "A".repeat(15 * 1024 * 1024);
        let img = ImageInput { base64_data: Some(huge), ..Default::default() };
        assert!(write_temp_file(&img).await.unwrap().is_none());
    }
}
