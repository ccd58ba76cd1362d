//! Single-item download orchestrator
//!
//! Drives one request through probe -> fetch -> transform -> finalize.
//! The probe is best-effort: on any failure it falls back to defaults
//! instead of failing the download. Every other error is caught at this
//! boundary and folded into a failed `DownloadResult`; the batch layer
//! always receives a result, never an error.

use crate::core::error::{DownloadError, Result};
use crate::core::{DownloadRequest, DownloadResult};
use crate::http::{HttpClient, ProbeInfo};
use crate::transform::{self, OutputFormat, TransformOptions};
use crate::{storage, validate};
use chrono::Utc;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Run one download to completion, reporting raw transport progress via
/// `emit(downloaded, total, speed_bps)`
pub(crate) async fn run_item<F>(
    client: &HttpClient,
    request: &DownloadRequest,
    emit: F,
) -> DownloadResult
where
    F: FnMut(u64, u64, f64),
{
    match execute(client, request, emit).await {
        Ok((path, size, content_type)) => {
            debug!(url = request.url, path = %path.display(), size, "download succeeded");
            DownloadResult::succeeded(&request.url, path, size, content_type)
        }
        Err(error) => {
            warn!(url = request.url, category = error.category(), %error, "download failed");
            DownloadResult::failed(&request.url, &error)
        }
    }
}

async fn execute<F>(
    client: &HttpClient,
    request: &DownloadRequest,
    mut emit: F,
) -> Result<(PathBuf, u64, String)>
where
    F: FnMut(u64, u64, f64),
{
    // Probing: failure is non-fatal, fall back to defaults
    let probe = match client.probe(&request.url).await {
        Ok(info) => info,
        Err(error) => {
            debug!(url = request.url, %error, "probe failed, using defaults");
            ProbeInfo::default()
        }
    };

    // Fetching
    let body = client
        .fetch(&request.url, probe.total, &mut emit)
        .await?;
    let fetched_content_type = body.content_type.unwrap_or(probe.content_type);

    // Transforming
    let (bytes, written_format, content_type) = if request.options.wants_transform() {
        let options = TransformOptions {
            format: request.options.format,
            compress: request.options.compress,
            quality: request.options.quality,
            max_width: request.options.max_width,
            max_height: request.options.max_height,
        };
        let (encoded, target) =
            transform::transform(&body.bytes, &options).map_err(|source| {
                DownloadError::Transform {
                    url: request.url.clone(),
                    source,
                }
            })?;
        (encoded, Some(target), target.content_type().to_string())
    } else {
        (body.bytes, None, fetched_content_type)
    };

    // Finalizing
    storage::ensure_dir(&request.options.dest_dir).await?;
    let filename = output_filename(request, written_format, &content_type);
    let path = storage::unique_path(&request.options.dest_dir, &filename).await;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| DownloadError::FileSystem {
            path: path.clone(),
            operation: crate::core::FileOperation::Write,
            source: e,
        })?;
    let size = storage::file_size(&path).await?;

    Ok((path, size, content_type))
}

/// Final filename: explicit override when supplied, otherwise the URL's path
/// stem plus a timestamp suffix and the correct extension for the written or
/// detected format
fn output_filename(
    request: &DownloadRequest,
    written_format: Option<OutputFormat>,
    content_type: &str,
) -> String {
    if let Some(filename) = &request.options.filename {
        return filename.clone();
    }

    let extension = match written_format {
        Some(format) => format.extension().to_string(),
        None => request
            .url_extension()
            .filter(|ext| validate::IMAGE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or_else(|| extension_from_content_type(content_type).to_string()),
    };

    format!(
        "{}_{}.{}",
        request.url_stem(),
        Utc::now().timestamp_millis(),
        extension
    )
}

fn extension_from_content_type(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/svg+xml" => "svg",
        _ => "jpg",
    }
}
