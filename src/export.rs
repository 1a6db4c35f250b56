//! Writing prompts and generated assets to disk.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::client::GeneratedAsset;
use crate::error::JobError;

/// `<prefix>_<YYYYMMDD_HHMMSS>.<extension>`
pub fn timestamped_filename(prefix: &str, extension: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}_{}.{extension}", now.format("%Y%m%d_%H%M%S"))
}

/// File extension for a vendor MIME label.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "text/plain" => "txt",
        _ => "bin",
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), JobError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    info!("Saved: {}", path.display());
    Ok(())
}

/// Writes prompt text as `<dir>/prompt_<timestamp>.txt`.
pub fn export_prompt(dir: &Path, prompt: &str, now: DateTime<Utc>) -> Result<PathBuf, JobError> {
    let path = dir.join(timestamped_filename("prompt", "txt", now));
    write_file(&path, prompt.as_bytes())?;
    Ok(path)
}

/// Writes an asset as `<dir>/<prefix>_<timestamp>.<ext>`.
pub fn export_asset(
    dir: &Path,
    prefix: &str,
    asset: &GeneratedAsset,
    now: DateTime<Utc>,
) -> Result<PathBuf, JobError> {
    let extension = extension_for_mime(&asset.mime_type);
    let path = dir.join(timestamped_filename(prefix, extension, now));
    write_file(&path, &asset.bytes)?;
    Ok(path)
}
