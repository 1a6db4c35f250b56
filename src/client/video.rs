//! Long-running video jobs: submit with model fallback, poll, fetch the result.
//!
//! The loop lives in [JobRunner] and talks to the service through the
//! [JobTransport] trait; [HttpJobTransport] speaks the `predictLongRunning`
//! protocol.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};
use url::Url;

use super::{ApiEndpoints, GeneratedAsset, ReferenceImage, build_http_client, decode_base64, read_json};
use crate::constants::GOOG_API_KEY_HEADER;
use crate::error::JobError;

/// MIME label used when the service does not report one.
pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// What to generate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VideoRequest {
    /// Prompt text.
    pub prompt: String,
    /// Optional first frame.
    pub image: Option<ReferenceImage>,
    /// Optional generation parameters; dropped if the model rejects them.
    pub parameters: Option<VideoParameters>,
}

/// Optional knobs sent alongside the prompt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoParameters {
    /// `16:9` or `9:16`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// For example `720p`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Clip length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// Things to keep out of the clip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

impl VideoRequest {
    /// Prompt-only request.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    fn without_parameters(&self) -> Self {
        Self {
            parameters: None,
            ..self.clone()
        }
    }
}

/// Opaque identifier of a submitted operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationHandle(pub String);

/// An accepted job and the model that accepted it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedJob {
    /// Model that accepted the job.
    pub model: String,
    /// Handle to poll.
    pub handle: OperationHandle,
}

/// Where a finished job's bytes are.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobPayload {
    /// Base64 bytes embedded in the poll response.
    Inline {
        /// Encoded content.
        data: String,
        /// Vendor MIME label.
        mime_type: Option<String>,
    },
    /// A link to fetch separately.
    Uri {
        /// Download location.
        uri: String,
        /// Vendor MIME label.
        mime_type: Option<String>,
    },
}

/// State of an operation as reported by one poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationStatus {
    /// Still running.
    Pending,
    /// Finished with a result.
    Succeeded(JobPayload),
    /// Finished with an error.
    Failed {
        /// Vendor error code.
        code: Option<i64>,
        /// Vendor error message.
        message: String,
    },
}

/// The three calls the poller needs from a service.
#[async_trait]
pub trait JobTransport: Send + Sync {
    /// Creates a job on `model`.
    async fn submit(&self, model: &str, request: &VideoRequest) -> Result<OperationHandle, JobError>;

    /// Queries an operation once.
    async fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, JobError>;

    /// Fetches a result link.
    async fn download(&self, uri: &str) -> Result<Vec<u8>, JobError>;
}

/// Poll cadence and budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    /// Sleep before each poll.
    pub interval: Duration,
    /// Wall-clock budget for the polling phase.
    pub max_wait: Duration,
}

/// Drives one job from submission to bytes.
#[derive(Debug)]
pub struct JobRunner<T> {
    transport: T,
    settings: PollSettings,
}

fn progress_fraction(elapsed: Duration, max_wait: Duration) -> f32 {
    if max_wait.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / max_wait.as_secs_f32()).clamp(0.0, 1.0)
}

impl<T: JobTransport> JobRunner<T> {
    /// Wraps a transport.
    pub fn new(transport: T, settings: PollSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Tries each candidate in order and returns the first accepted job.
    ///
    /// Not-found and overloaded responses move on to the next candidate; any
    /// other error ends the submission.
    pub async fn submit_with_fallback(
        &self,
        request: &VideoRequest,
        candidates: &[String],
    ) -> Result<SubmittedJob, JobError> {
        for model in candidates {
            match self.submit_one(model, request).await {
                Ok(handle) => {
                    info!("Video job accepted by {model}: {}", handle.0);
                    return Ok(SubmittedJob {
                        model: model.clone(),
                        handle,
                    });
                }
                Err(err) if err.is_fallback() => {
                    warn!("Video model {model} unavailable, trying the next one: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Err(JobError::NoModelAvailable)
    }

    async fn submit_one(&self, model: &str, request: &VideoRequest) -> Result<OperationHandle, JobError> {
        match self.transport.submit(model, request).await {
            Err(JobError::BadRequest(detail)) if request.parameters.is_some() => {
                warn!("{model} rejected the video parameters, retrying without them: {detail}");
                self.transport
                    .submit(model, &request.without_parameters())
                    .await
            }
            other => other,
        }
    }

    /// Polls until the job finishes, fails or runs out of budget.
    ///
    /// A poll still in flight when the budget ends is abandoned, so the loop
    /// never runs past `max_wait`.
    ///
    /// `progress` receives elapsed time over the budget, in `[0, 1]`.
    pub async fn wait_for<F>(&self, job: &SubmittedJob, mut progress: F) -> Result<GeneratedAsset, JobError>
    where
        F: FnMut(f32),
    {
        let PollSettings { interval, max_wait } = self.settings;
        if interval.is_zero() {
            return Err(JobError::Validation(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let started = Instant::now();
        let deadline = started + max_wait;
        let mut polls = 0u32;
        loop {
            let elapsed = started.elapsed();
            progress(progress_fraction(elapsed, max_wait));
            if elapsed + interval > max_wait {
                warn!(
                    "Giving up on {} after {polls} poll(s) and {}s",
                    job.handle.0,
                    elapsed.as_secs()
                );
                return Err(JobError::Timeout);
            }

            sleep(interval).await;
            polls += 1;
            let Ok(polled) = timeout_at(deadline, self.transport.poll(&job.handle)).await else {
                warn!(
                    "Poll {polls} for {} did not answer within the {}s budget",
                    job.handle.0,
                    max_wait.as_secs()
                );
                return Err(JobError::Timeout);
            };
            match polled {
                Ok(OperationStatus::Pending) => {
                    debug!("{} not done after poll {polls}", job.handle.0);
                }
                Ok(OperationStatus::Succeeded(payload)) => {
                    progress(1.0);
                    return self.fetch_payload(payload).await;
                }
                Ok(OperationStatus::Failed { code, message }) => {
                    return Err(JobError::Service { code, message });
                }
                Err(JobError::Malformed(detail)) => return Err(JobError::Malformed(detail)),
                Err(err) => {
                    warn!("Poll {polls} for {} failed, continuing: {err}", job.handle.0);
                }
            }
        }
    }

    async fn fetch_payload(&self, payload: JobPayload) -> Result<GeneratedAsset, JobError> {
        let (bytes, mime_type) = match payload {
            JobPayload::Inline { data, mime_type } => (decode_base64(&data)?, mime_type),
            JobPayload::Uri { uri, mime_type } => {
                debug!("Downloading video from {uri}");
                (self.transport.download(&uri).await?, mime_type)
            }
        };
        Ok(GeneratedAsset {
            bytes,
            mime_type: mime_type.unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string()),
        })
    }

    /// Submits with fallback, then waits for the result.
    pub async fn run<F>(
        &self,
        request: &VideoRequest,
        candidates: &[String],
        progress: F,
    ) -> Result<GeneratedAsset, JobError>
    where
        F: FnMut(f32),
    {
        let job = self.submit_with_fallback(request, candidates).await?;
        self.wait_for(&job, progress).await
    }
}

/// Submits `prompt` to the first willing model and returns the video bytes.
pub async fn run_async_job(
    prompt: &str,
    credential: &str,
    candidate_models: &[String],
    poll_interval: Duration,
    max_wait: Duration,
) -> Result<Vec<u8>, JobError> {
    run_async_job_with_endpoints(
        &ApiEndpoints::defaults()?,
        prompt,
        credential,
        candidate_models,
        poll_interval,
        max_wait,
    )
    .await
}

/// [run_async_job] against explicit endpoints.
pub async fn run_async_job_with_endpoints(
    endpoints: &ApiEndpoints,
    prompt: &str,
    credential: &str,
    candidate_models: &[String],
    poll_interval: Duration,
    max_wait: Duration,
) -> Result<Vec<u8>, JobError> {
    let transport = HttpJobTransport::new(build_http_client()?, endpoints, credential);
    let runner = JobRunner::new(
        transport,
        PollSettings {
            interval: poll_interval,
            max_wait,
        },
    );
    let asset = runner
        .run(&VideoRequest::new(prompt), candidate_models, |fraction| {
            debug!("Video progress {:.0}%", fraction * 100.0);
        })
        .await?;
    Ok(asset.bytes)
}

// -----------------------------
// predictLongRunning over HTTP
// -----------------------------

#[derive(Serialize, Debug)]
struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a VideoParameters>,
}

#[derive(Serialize, Debug)]
struct Instance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InstanceImage<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InstanceImage<'a> {
    bytes_base64_encoded: &'a str,
    mime_type: &'a str,
}

#[derive(Deserialize, Debug)]
struct OperationCreated {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OperationBody {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<PredictResponse>,
}

#[derive(Deserialize, Debug)]
struct OperationError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
    #[serde(default)]
    videos: Vec<VideoPayload>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct GeneratedSample {
    video: VideoPayload,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VideoPayload {
    #[serde(default, alias = "gcsUri")]
    uri: Option<String>,
    #[serde(default, alias = "encodedVideo")]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

impl OperationBody {
    fn into_status(self) -> Result<OperationStatus, JobError> {
        if let Some(error) = self.error {
            return Ok(OperationStatus::Failed {
                code: error.code,
                message: error.message,
            });
        }
        if !self.done {
            return Ok(OperationStatus::Pending);
        }

        let response = self.response.unwrap_or_default();
        let (samples, filtered) = match response.generate_video_response {
            Some(generated) => (
                generated
                    .generated_samples
                    .into_iter()
                    .map(|sample| sample.video)
                    .collect::<Vec<_>>(),
                generated.rai_media_filtered_reasons,
            ),
            None => (Vec::new(), Vec::new()),
        };
        let video = samples.into_iter().chain(response.videos).next();

        match video {
            Some(VideoPayload {
                bytes_base64_encoded: Some(data),
                mime_type,
                ..
            }) => Ok(OperationStatus::Succeeded(JobPayload::Inline { data, mime_type })),
            Some(VideoPayload {
                uri: Some(uri),
                mime_type,
                ..
            }) => Ok(OperationStatus::Succeeded(JobPayload::Uri { uri, mime_type })),
            _ if !filtered.is_empty() => Ok(OperationStatus::Failed {
                code: None,
                message: format!("video was filtered: {}", filtered.join("; ")),
            }),
            _ => Err(JobError::Malformed(
                "operation finished without a video".to_string(),
            )),
        }
    }
}

/// [JobTransport] for the generative language REST API.
#[derive(Clone, Debug)]
pub struct HttpJobTransport {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl HttpJobTransport {
    /// Creates a transport against the given endpoints.
    pub fn new(http: reqwest::Client, endpoints: &ApiEndpoints, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base: endpoints.gemini.clone(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl JobTransport for HttpJobTransport {
    async fn submit(&self, model: &str, request: &VideoRequest) -> Result<OperationHandle, JobError> {
        let url = self
            .base
            .join(&format!("v1beta/models/{model}:predictLongRunning"))?;
        let body = PredictRequest {
            instances: [Instance {
                prompt: &request.prompt,
                image: request.image.as_ref().map(|image| InstanceImage {
                    bytes_base64_encoded: &image.data,
                    mime_type: &image.mime_type,
                }),
            }],
            parameters: request.parameters.as_ref(),
        };
        debug!("POST {url}");
        let response = self
            .http
            .post(url)
            .header(GOOG_API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let created: OperationCreated = read_json(response, "predictLongRunning").await?;
        created
            .name
            .filter(|name| !name.is_empty())
            .map(OperationHandle)
            .ok_or_else(|| JobError::Malformed("submission returned no operation name".to_string()))
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, JobError> {
        let url = self.base.join(&format!("v1beta/{}", handle.0))?;
        let response = self
            .http
            .get(url)
            .header(GOOG_API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let body: OperationBody = read_json(response, "operation status").await?;
        body.into_status()
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, JobError> {
        let response = self
            .http
            .get(uri)
            .header(GOOG_API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(JobError::from_status(
                status.as_u16(),
                &String::from_utf8_lossy(&bytes),
            ));
        }
        Ok(bytes.to_vec())
    }
}
