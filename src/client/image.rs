//! Synchronous image generation with a short model fallback list.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::{ApiEndpoints, GeneratedAsset, ReferenceImage, decode_base64, read_json};
use crate::constants::{GOOG_API_KEY_HEADER, REDUCED_IMAGE_SIZE};
use crate::error::JobError;

/// What to render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageRequest {
    /// Prompt text.
    pub prompt: String,
    /// Images the model should take into account.
    pub references: Vec<ReferenceImage>,
    /// Normalized ratio code such as `16:9`.
    pub aspect_ratio: Option<String>,
    /// Resolution hint such as `2K`.
    pub image_size: Option<String>,
}

impl ImageRequest {
    /// Prompt-only request.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    fn has_image_config(&self) -> bool {
        self.aspect_ratio.is_some() || self.image_size.is_some()
    }

    fn without_image_config(&self) -> Self {
        Self {
            aspect_ratio: None,
            image_size: None,
            ..self.clone()
        }
    }

    fn at_reduced_size(&self) -> Option<Self> {
        if self.image_size.as_deref() == Some(REDUCED_IMAGE_SIZE) {
            return None;
        }
        Some(Self {
            image_size: Some(REDUCED_IMAGE_SIZE.to_string()),
            ..self.clone()
        })
    }
}

// -----------------------------
// Wire format
// -----------------------------

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataOut<'a>,
    },
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InlineDataOut<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'a str; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ImageConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<InlineDataIn>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct InlineDataIn {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: String,
    data: String,
}

fn request_body(request: &ImageRequest) -> GenerateContentRequest<'_> {
    let mut parts = vec![RequestPart::Text {
        text: &request.prompt,
    }];
    parts.extend(request.references.iter().map(|reference| RequestPart::Inline {
        inline_data: InlineDataOut {
            mime_type: &reference.mime_type,
            data: &reference.data,
        },
    }));
    let image_config = request.has_image_config().then(|| ImageConfig {
        aspect_ratio: request.aspect_ratio.as_deref(),
        image_size: request.image_size.as_deref(),
    });
    GenerateContentRequest {
        contents: [Content {
            role: "user",
            parts,
        }],
        generation_config: GenerationConfig {
            response_modalities: ["TEXT", "IMAGE"],
            image_config,
        },
    }
}

fn extract_image(response: GenerateContentResponse) -> Result<GeneratedAsset, JobError> {
    let mut model_text = None;
    for part in response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
    {
        if let Some(inline) = part.inline_data {
            return Ok(GeneratedAsset {
                bytes: decode_base64(&inline.data)?,
                mime_type: inline.mime_type,
            });
        }
        if model_text.is_none() {
            model_text = part.text;
        }
    }
    Err(JobError::Malformed(match model_text {
        Some(text) => format!("no image in response, model said: {text}"),
        None => "no image in response".to_string(),
    }))
}

// -----------------------------
// Client
// -----------------------------

/// Posts generate requests for a single model.
#[derive(Clone, Debug)]
pub struct ImageClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl ImageClient {
    /// Creates a client against the generative language endpoint.
    pub fn new(http: reqwest::Client, endpoints: &ApiEndpoints, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base: endpoints.gemini.clone(),
            api_key: api_key.into(),
        }
    }

    /// One POST for one model, no retries.
    pub async fn generate_with_model(
        &self,
        model: &str,
        request: &ImageRequest,
    ) -> Result<GeneratedAsset, JobError> {
        let url = self
            .base
            .join(&format!("v1beta/models/{model}:generateContent"))?;
        debug!(
            "POST {url} with {} reference image(s)",
            request.references.len()
        );
        let response = self
            .http
            .post(url)
            .header(GOOG_API_KEY_HEADER, &self.api_key)
            .json(&request_body(request))
            .send()
            .await?;
        let parsed: GenerateContentResponse = read_json(response, "generate content").await?;
        extract_image(parsed)
    }

    /// Starts a session over an ordered model list.
    pub fn session(&self, models: &[String]) -> ImageSession<'_> {
        ImageSession {
            client: self,
            models: models.to_vec(),
            resolved: None,
        }
    }
}

/// A run of image requests that remembers which model last worked.
#[derive(Debug)]
pub struct ImageSession<'a> {
    client: &'a ImageClient,
    models: Vec<String>,
    resolved: Option<String>,
}

impl ImageSession<'_> {
    /// The model that served the last successful request.
    pub fn resolved_model(&self) -> Option<&str> {
        self.resolved.as_deref()
    }

    fn candidates(&self) -> Vec<String> {
        let mut ordered = Vec::with_capacity(self.models.len());
        if let Some(resolved) = &self.resolved {
            ordered.push(resolved.clone());
        }
        ordered.extend(
            self.models
                .iter()
                .filter(|model| Some(*model) != self.resolved.as_ref())
                .cloned(),
        );
        ordered
    }

    /// Generates one image, falling back across models on 429/503.
    ///
    /// A 404 clears the remembered model and is returned so the caller can retry.
    pub async fn generate(&mut self, request: &ImageRequest) -> Result<GeneratedAsset, JobError> {
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Err(JobError::NoModelAvailable);
        }
        for model in candidates {
            match self.attempt(&model, request).await {
                Ok(asset) => {
                    info!("Image generated with {model}");
                    self.resolved = Some(model);
                    return Ok(asset);
                }
                Err(JobError::NotFound(detail)) => {
                    warn!("Image model {model} not found, clearing the selection");
                    self.resolved = None;
                    return Err(JobError::NotFound(detail));
                }
                Err(JobError::Overloaded(detail)) => {
                    warn!("Image model {model} overloaded, trying the next one: {detail}");
                }
                Err(err) => return Err(err),
            }
        }
        Err(JobError::Overloaded(
            "every image model is overloaded".to_string(),
        ))
    }

    async fn attempt(&self, model: &str, request: &ImageRequest) -> Result<GeneratedAsset, JobError> {
        match self.client.generate_with_model(model, request).await {
            Err(JobError::BadRequest(detail)) if request.has_image_config() => {
                warn!("{model} rejected the image config, retrying without it: {detail}");
                self.client
                    .generate_with_model(model, &request.without_image_config())
                    .await
            }
            Err(JobError::Timeout) => match request.at_reduced_size() {
                Some(reduced) => {
                    warn!("{model} timed out, retrying at {REDUCED_IMAGE_SIZE}");
                    self.client.generate_with_model(model, &reduced).await
                }
                None => Err(JobError::Timeout),
            },
            other => other,
        }
    }
}
