use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::client::{LlmClient, ModelRequest, ResponseFormat, Role};
use super::credentials::CredentialPool;
use crate::error::ProviderError;
use crate::util::preview;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

fn transport_error(err: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(Duration::from_secs(timeout_secs))
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Turn a non-success response into a classified error, keeping a short body excerpt
async fn status_error(
    provider: &str,
    response: reqwest::Response,
    timeout_secs: u64,
) -> ProviderError {
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) if err.is_timeout() => return transport_error(err, timeout_secs),
        Err(err) => {
            warn!("{} API error {}: body unreadable: {}", provider, status, err);
            String::new()
        }
    };
    warn!("{} API error {}: {}", provider, status, preview(&body, 300));
    ProviderError::from_status(status, preview(&body, 500))
}

/// Read a success body in full, then decode it.
///
/// Failing to read the body is a transport failure (or a timeout); only a body
/// that arrived but does not parse is a malformed envelope.
async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    timeout_secs: u64,
) -> Result<T, ProviderError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport_error(e, timeout_secs))?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::MalformedEnvelope(e.to_string()))
}

// ============================================================================
// Gemini Client (Google Generative AI)
// ============================================================================

pub struct GeminiClient {
    keys: CredentialPool,
    model: String,
    base_url: String,
    timeout_secs: u64,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Finish reasons meaning the candidate was withheld by a safety filter
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "RECITATION",
];

impl GeminiClient {
    pub fn new(
        keys: CredentialPool,
        model: String,
        base_url: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            keys,
            model,
            base_url: base_url
                .as_deref()
                .unwrap_or(GEMINI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            timeout_secs,
            client: build_http_client(timeout_secs)?,
        })
    }

    fn build_request(request: &ModelRequest) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = request
            .history
            .iter()
            .map(|turn| GeminiContent {
                role: Some(
                    match turn.role {
                        Role::User => "user",
                        Role::Model => "model",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart {
                    text: turn.content.clone(),
                }],
            })
            .collect();
        contents.push(GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: request.instruction.clone(),
            }],
        });

        let (response_mime_type, response_schema) = match &request.format {
            ResponseFormat::Text => (None, None),
            ResponseFormat::Json { schema } => {
                (Some("application/json".to_string()), Some(schema.clone()))
            }
        };

        GeminiRequest {
            contents,
            system_instruction: request.system.as_ref().map(|system| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system.clone(),
                }],
            }),
            generation_config: GeminiGenerationConfig {
                temperature: request.decoding.temperature,
                top_p: request.decoding.top_p,
                top_k: request.decoding.top_k,
                max_output_tokens: request.decoding.max_output_tokens,
                response_mime_type,
                response_schema,
            },
        }
    }

    fn read_text(response: GeminiResponse) -> Result<String, ProviderError> {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::ContentFiltered(reason));
        }

        let Some(candidate) = response.candidates.into_iter().next() else {
            return Err(ProviderError::MalformedEnvelope(
                "no candidates in Gemini response".to_string(),
            ));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            if let Some(reason) = candidate
                .finish_reason
                .filter(|r| BLOCKED_FINISH_REASONS.contains(&r.as_str()))
            {
                return Err(ProviderError::ContentFiltered(reason));
            }
            return Err(ProviderError::MalformedEnvelope(
                "no text in Gemini candidate".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn send(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        let body = Self::build_request(request);
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        debug!("Calling Gemini API with model: {}", self.model);

        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(key) = self.keys.next_key() {
            req = req.header("x-goog-api-key", key.expose());
        }

        let response = req
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(status_error("Gemini", response, self.timeout_secs).await);
        }

        let api_response: GeminiResponse = read_envelope(response, self.timeout_secs).await?;

        Self::read_text(api_response)
    }
}

// ============================================================================
// OpenAI-compatible Client (OpenAI, Groq, local gateways)
// ============================================================================

pub struct OpenAICompatibleClient {
    name: String,
    keys: CredentialPool,
    model: String,
    base_url: String,
    timeout_secs: u64,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl OpenAICompatibleClient {
    pub fn new(
        name: &str,
        keys: CredentialPool,
        model: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            keys,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            client: build_http_client(timeout_secs)?,
        })
    }

    fn build_request(&self, request: &ModelRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }
        for turn in &request.history {
            messages.push(OpenAIMessage {
                role: match turn.role {
                    Role::User => "user",
                    Role::Model => "assistant",
                }
                .to_string(),
                content: Some(turn.content.clone()),
            });
        }
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: Some(request.instruction.clone()),
        });

        // GPT-5+ models use max_completion_tokens instead of max_tokens
        let limit = request.decoding.max_output_tokens;
        let (max_tokens, max_completion_tokens) = if self.model.starts_with("gpt-5") {
            (None, Some(limit))
        } else {
            (Some(limit), None)
        };

        // top_k has no equivalent here; the schema is enforced by the instruction instead
        let response_format = match request.format {
            ResponseFormat::Text => None,
            ResponseFormat::Json { .. } => Some(serde_json::json!({ "type": "json_object" })),
        };

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            temperature: request.decoding.temperature,
            top_p: request.decoding.top_p,
            max_tokens,
            max_completion_tokens,
            response_format,
        }
    }

    fn read_text(response: OpenAIResponse) -> Result<String, ProviderError> {
        let Some(choice) = response.choices.into_iter().next() else {
            return Err(ProviderError::MalformedEnvelope(
                "no choices in response".to_string(),
            ));
        };
        match choice.message.content.filter(|c| !c.is_empty()) {
            Some(text) => Ok(text),
            None if choice.finish_reason.as_deref() == Some("content_filter") => Err(
                ProviderError::ContentFiltered("content_filter".to_string()),
            ),
            None => Err(ProviderError::MalformedEnvelope(
                "no content in first choice".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAICompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        let body = self.build_request(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            "Calling OpenAI-compatible API at {} with model: {}",
            self.base_url, self.model
        );

        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(key) = self.keys.next_key() {
            req = req.header("authorization", format!("Bearer {}", key.expose()));
        }

        let response = req
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(status_error(&self.name, response, self.timeout_secs).await);
        }

        let api_response: OpenAIResponse = read_envelope(response, self.timeout_secs).await?;

        Self::read_text(api_response)
    }
}

// ============================================================================
// Tests
// ============================================================================
