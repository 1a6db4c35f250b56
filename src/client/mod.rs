//! HTTP clients for the chat, image and video services.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose;
use serde::de::DeserializeOwned;
use url::Url;

use crate::constants::{DEFAULT_GEMINI_BASE_URL, DEFAULT_OPENAI_BASE_URL, REQUEST_TIMEOUT};
use crate::error::JobError;

pub mod chat;
pub mod image;
pub mod video;

/// Base URLs for the two vendors.
#[derive(Clone, Debug)]
pub struct ApiEndpoints {
    /// Chat-completions service.
    pub openai: Url,
    /// Image and video generation service.
    pub gemini: Url,
}

impl ApiEndpoints {
    /// The public vendor endpoints.
    pub fn defaults() -> Result<Self, JobError> {
        Self::new(DEFAULT_OPENAI_BASE_URL, DEFAULT_GEMINI_BASE_URL)
    }

    /// Parses both base URLs, appending a trailing slash so joins keep the path.
    pub fn new(openai: &str, gemini: &str) -> Result<Self, JobError> {
        Ok(Self {
            openai: parse_base(openai)?,
            gemini: parse_base(gemini)?,
        })
    }
}

fn parse_base(raw: &str) -> Result<Url, JobError> {
    if raw.ends_with('/') {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("{raw}/"))?)
    }
}

/// Builds the shared reqwest client with the per-request timeout.
pub fn build_http_client() -> Result<reqwest::Client, JobError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(JobError::from)
}

/// Bytes returned by a generation service together with the vendor's MIME label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedAsset {
    /// Raw content.
    pub bytes: Vec<u8>,
    /// MIME type as reported by the vendor.
    pub mime_type: String,
}

/// An image sent along with a prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceImage {
    /// MIME type sent to the service.
    pub mime_type: String,
    /// Base64 (standard alphabet) content.
    pub data: String,
}

impl ReferenceImage {
    /// Encodes raw bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Reads a file, taking the MIME type from its extension.
    pub fn from_path(path: &Path) -> Result<Self, JobError> {
        let format = ::image::ImageFormat::from_path(path).map_err(|err| {
            JobError::Validation(format!(
                "unsupported reference image {}: {err}",
                path.display()
            ))
        })?;
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(&bytes, format.to_mime_type()))
    }

    /// Reuses a generated image as the reference for a follow-up call.
    pub fn from_asset(asset: &GeneratedAsset) -> Self {
        Self::from_bytes(&asset.bytes, asset.mime_type.clone())
    }
}

/// Decodes a standard base64 payload.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, JobError> {
    Ok(general_purpose::STANDARD.decode(data.trim())?)
}

/// Reads the body, mapping non-success statuses to a [JobError] and parsing JSON otherwise.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, JobError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(JobError::from_status(
            status.as_u16(),
            &String::from_utf8_lossy(&bytes),
        ));
    }
    serde_json::from_slice(&bytes).map_err(|err| JobError::Malformed(format!("{what}: {err}")))
}
