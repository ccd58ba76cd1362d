//! URL validation
//!
//! Only `http`/`https` URLs are accepted, and a URL counts as an image URL
//! when its path ends in a known image extension or its query string carries
//! an image-format hint. Batch validation is atomic: one bad URL rejects the
//! whole batch before any network activity.

use crate::core::error::{DownloadError, Result};
use url::Url;

/// Extensions accepted in an image URL's path or query hint
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "svg",
];

/// Whether a parsed URL looks like an image URL
pub fn is_image_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    if IMAGE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
    {
        return true;
    }

    // Accept query hints like ?format=png or ?file=photo.jpg. Only whole
    // values count, so a value merely containing "png" is not a hint.
    match url.query() {
        Some(query) => query
            .to_ascii_lowercase()
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .any(|(_, value)| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|ext| value == *ext || value.ends_with(&format!(".{ext}")))
            }),
        None => false,
    }
}

/// Parse and validate a single image URL
pub fn parse_image_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| DownloadError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(DownloadError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{scheme}' (supported: http, https)"),
            });
        }
    }

    if !is_image_url(&url) {
        return Err(DownloadError::InvalidUrl {
            url: raw.to_string(),
            reason: "path does not end in an image extension and query carries no format hint"
                .to_string(),
        });
    }

    Ok(url)
}

/// Validate every URL in a batch, listing all offenders on rejection
pub fn validate_batch<S: AsRef<str>>(urls: &[S]) -> Result<()> {
    let invalid: Vec<String> = urls
        .iter()
        .filter(|raw| parse_image_url(raw.as_ref()).is_err())
        .map(|raw| raw.as_ref().to_string())
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(DownloadError::InvalidBatch { urls: invalid })
    }
}
