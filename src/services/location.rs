//! Location extraction via an OpenAI-compatible chat-completions endpoint.
//!
//! The model is asked for a strict JSON-schema reply with a single
//! `location` string. Every failure collapses to `None` at the trait
//! boundary; the pipeline then falls back to the default location.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::LlmConfig;
use crate::services::weatherapi::truncate_error_body;

const INSTRUCTIONS: &str = "You are a helpful weather assistant. Given a query, you need to \
    extract the location and return the location mentioned in the query as a response.";

const SCHEMA_NAME: &str = "location_extractor";

/// Pulls a single place name out of a free-text query.
#[async_trait]
pub trait LocationExtractor: Send + Sync {
    /// Returns `None` when no usable location could be extracted, for any reason.
    async fn extract(&self, query: &str) -> Option<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no model API key configured")]
    Disabled,

    #[error("model request failed: {0}")]
    Request(String),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed model response: {0}")]
    Malformed(String),

    #[error("model refused: {0}")]
    Refused(String),

    #[error("model returned an empty location")]
    Empty,
}

/// The structured output the model must produce.
#[derive(Debug, Deserialize)]
struct LocationReply {
    location: String,
}

// --- chat-completions response types (only what we read) ---

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    refusal: Option<String>,
}

/// `LocationExtractor` backed by a chat-completions model.
#[derive(Debug, Clone)]
pub struct OpenAiLocationExtractor {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiLocationExtractor {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Request body for one extraction call.
    fn request_body(&self, query: &str) -> Value {
        json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {"role": "system", "content": INSTRUCTIONS},
                {"role": "user", "content": query}
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": SCHEMA_NAME,
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": {
                            "location": {
                                "type": "string",
                                "description": "Location name, extracted from the user query"
                            }
                        },
                        "required": ["location"],
                        "additionalProperties": false
                    }
                }
            }
        })
    }

    /// Run one extraction call, reporting exactly why it failed.
    pub async fn try_extract(&self, query: &str) -> Result<String, ExtractError> {
        let api_key = self.config.api_key.as_deref().ok_or(ExtractError::Disabled)?;
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.config.timeout)
            .json(&self.request_body(query))
            .send()
            .await
            .map_err(|e| ExtractError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Status {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Malformed(e.without_url().to_string()))?;

        parse_completion(completion)
    }
}

#[async_trait]
impl LocationExtractor for OpenAiLocationExtractor {
    async fn extract(&self, query: &str) -> Option<String> {
        match self.try_extract(query).await {
            Ok(location) => {
                tracing::debug!("Extracted location '{}'", location);
                Some(location)
            }
            Err(ExtractError::Disabled) => {
                tracing::debug!("Location extraction disabled, no model API key");
                None
            }
            Err(e) => {
                tracing::warn!("Location extraction failed: {}", e);
                None
            }
        }
    }
}

fn parse_completion(completion: CompletionResponse) -> Result<String, ExtractError> {
    let message = completion
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ExtractError::Malformed("no choices".to_string()))?;

    if let Some(refusal) = message.refusal {
        return Err(ExtractError::Refused(refusal));
    }

    let content = message
        .content
        .ok_or_else(|| ExtractError::Malformed("no message content".to_string()))?;

    let reply: LocationReply =
        serde_json::from_str(&content).map_err(|e| ExtractError::Malformed(e.to_string()))?;

    let location = reply.location.trim();
    if location.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(location.to_string())
}
