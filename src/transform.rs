//! Image transform stage
//!
//! Decodes a downloaded byte buffer, applies an optional fit-inside resize
//! and re-encodes to the requested output format. The format table is a
//! closed enum validated at configuration time, so an unsupported format
//! fails fast instead of deep in the pipeline.

use crate::core::error::{DownloadError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// Closed table of supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Tiff,
}

impl OutputFormat {
    /// Parse a user-supplied format string, accepting common aliases
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "gif" => Ok(Self::Gif),
            "tif" | "tiff" => Ok(Self::Tiff),
            _ => Err(DownloadError::UnsupportedFormat {
                format: raw.to_string(),
            }),
        }
    }

    /// File extension written to disk
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
        }
    }

    /// Quality used when none is requested
    pub fn default_quality(&self) -> u8 {
        80
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
        }
    }

    /// Map a detected input format into the closed table, defaulting to jpeg
    /// for inputs we can decode but not re-encode (e.g. bmp)
    fn from_detected(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => Self::Png,
            ImageFormat::WebP => Self::WebP,
            ImageFormat::Gif => Self::Gif,
            ImageFormat::Tiff => Self::Tiff,
            _ => Self::Jpeg,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Options for one pass through the transform stage
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Target format; re-encode in the detected input format when absent
    pub format: Option<OutputFormat>,
    pub compress: bool,
    pub quality: Option<u8>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

/// Fit-inside target dimensions, preserving aspect ratio and never upscaling
///
/// Either bound may be absent; bounds beyond the source dimensions are
/// clamped to the source, so output never exceeds the original.
pub fn fit_within(
    width: u32,
    height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> (u32, u32) {
    let bound_w = max_width.unwrap_or(width).min(width).max(1);
    let bound_h = max_height.unwrap_or(height).min(height).max(1);

    if width <= bound_w && height <= bound_h {
        return (width, height);
    }

    let ratio_w = bound_w as f64 / width as f64;
    let ratio_h = bound_h as f64 / height as f64;
    let ratio = ratio_w.min(ratio_h);

    let out_w = ((width as f64 * ratio).round() as u32).clamp(1, width);
    let out_h = ((height as f64 * ratio).round() as u32).clamp(1, height);
    (out_w, out_h)
}

/// Decode, optionally resize, and re-encode a downloaded image
///
/// Returns the encoded bytes together with the format actually written,
/// which decides the on-disk extension.
pub fn transform(
    bytes: &[u8],
    options: &TransformOptions,
) -> std::result::Result<(Vec<u8>, OutputFormat), image::ImageError> {
    let detected = image::guess_format(bytes).ok();
    let img = image::load_from_memory(bytes)?;

    let target = options
        .format
        .or(detected.map(OutputFormat::from_detected))
        .unwrap_or(OutputFormat::Jpeg);

    let (orig_w, orig_h) = (img.width(), img.height());
    let (out_w, out_h) = fit_within(orig_w, orig_h, options.max_width, options.max_height);

    let img = if (out_w, out_h) != (orig_w, orig_h) {
        debug!(orig_w, orig_h, out_w, out_h, "resizing image");
        img.resize_exact(out_w, out_h, FilterType::Lanczos3)
    } else {
        img
    };

    let quality = options
        .quality
        .unwrap_or_else(|| target.default_quality())
        .clamp(1, 100);

    let encoded = encode(&img, target, options.compress, quality)?;
    Ok((encoded, target))
}

fn encode(
    img: &DynamicImage,
    target: OutputFormat,
    compress: bool,
    quality: u8,
) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut out = Vec::new();

    match target {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let img = DynamicImage::ImageRgb8(img.to_rgb8());
            let quality = if compress { quality } else { 95 };
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
        }
        OutputFormat::Png => {
            let compression = if compress {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut out,
                compression,
                PngFilterType::Adaptive,
            ))?;
        }
        OutputFormat::WebP => {
            // The webp encoder is lossless-only; the quality knob is a no-op.
            img.write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
        }
        OutputFormat::Gif => {
            img.write_to(&mut Cursor::new(&mut out), ImageFormat::Gif)?;
        }
        OutputFormat::Tiff => {
            img.write_to(&mut Cursor::new(&mut out), ImageFormat::Tiff)?;
        }
    }

    Ok(out)
}
