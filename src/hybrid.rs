//! Two-stage generation: a text-free base render, then a text overlay and refine pass.

use tracing::info;

use crate::client::image::{ImageClient, ImageRequest};
use crate::client::{GeneratedAsset, ReferenceImage};
use crate::error::JobError;
use crate::prompt::{hybrid_base_prompt, hybrid_overlay_prompt};

/// Both stages' outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HybridOutput {
    /// Stage one, no text.
    pub base: GeneratedAsset,
    /// Stage two, with overlay.
    pub refined: GeneratedAsset,
}

/// Model lists for each stage.
#[derive(Clone, Debug)]
pub struct HybridModels {
    /// Used for the base render.
    pub base: Vec<String>,
    /// Used for the overlay pass.
    pub refine: Vec<String>,
}

/// Runs both stages in sequence. The base image is sent as the only extra
/// reference for stage two, after any caller references.
pub async fn generate_hybrid(
    client: &ImageClient,
    models: &HybridModels,
    request: &ImageRequest,
    ad_copy: Option<&str>,
) -> Result<HybridOutput, JobError> {
    let base_request = ImageRequest {
        prompt: hybrid_base_prompt(&request.prompt),
        ..request.clone()
    };
    let base = client.session(&models.base).generate(&base_request).await?;
    info!("Hybrid base image ready ({} bytes)", base.bytes.len());

    let mut refine_request = ImageRequest {
        prompt: hybrid_overlay_prompt(ad_copy),
        ..request.clone()
    };
    refine_request.references.push(ReferenceImage::from_asset(&base));
    let refined = client
        .session(&models.refine)
        .generate(&refine_request)
        .await?;

    Ok(HybridOutput { base, refined })
}
