//! Chat-completions call used to polish assembled prompts.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{ApiEndpoints, read_json};
use crate::constants::{DEFAULT_POLISH_MODEL, POLISH_TEMPERATURE};
use crate::error::JobError;

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Request body for POST /v1/chat/completions
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Talks to a chat-completions endpoint.
#[derive(Clone, Debug)]
pub struct ChatClient {
    http: reqwest::Client,
    url: Url,
    api_key: String,
    model: String,
}

/// Outcome of [polish_or_fallback].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polished {
    /// Refined prose, or the original text when polishing failed.
    pub text: String,
    /// False when the original text was returned.
    pub polished: bool,
}

impl ChatClient {
    /// Creates a client using the default polish model.
    pub fn new(
        http: reqwest::Client,
        endpoints: &ApiEndpoints,
        api_key: impl Into<String>,
    ) -> Result<Self, JobError> {
        Ok(Self {
            http,
            url: endpoints.openai.join("v1/chat/completions")?,
            api_key: api_key.into(),
            model: DEFAULT_POLISH_MODEL.to_string(),
        })
    }

    /// Overrides the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sends a system + user pair and returns the first reply.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, JobError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: POLISH_TEMPERATURE,
        };
        debug!("Polishing prompt with {}", self.model);
        let response = self
            .http
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: ChatResponse = read_json(response, "chat completion").await?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| JobError::Malformed("chat completion had no content".to_string()))
    }
}

/// Polishes `user_prompt`, returning it unchanged when the call fails.
pub async fn polish_or_fallback(client: &ChatClient, system: &str, user_prompt: &str) -> Polished {
    match client.complete(system, user_prompt).await {
        Ok(text) => Polished {
            text,
            polished: true,
        },
        Err(err) => {
            warn!("Prompt polish failed, using the assembled prompt: {err}");
            Polished {
                text: user_prompt.to_string(),
                polished: false,
            }
        }
    }
}
