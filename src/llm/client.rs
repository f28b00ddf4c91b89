use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::prompts;
use crate::config::DecodingConfig;
use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One prior message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// What shape of reply the caller asks the provider for
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Provider-enforced JSON; providers that accept a schema get this one
    Json { schema: serde_json::Value },
}

/// Everything a provider needs for one call
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub history: Vec<Turn>,
    pub instruction: String,
    pub decoding: DecodingConfig,
    pub format: ResponseFormat,
}

impl ModelRequest {
    pub fn new(instruction: impl Into<String>, decoding: DecodingConfig) -> Self {
        Self {
            system: None,
            history: Vec::new(),
            instruction: instruction.into(),
            decoding,
            format: ResponseFormat::Text,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }
}

/// A text-generation provider: one network call per `send`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, request: &ModelRequest) -> Result<String, ProviderError>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn send(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn send(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        (**self).send(request).await
    }
}

/// Canned replies for dry runs, chosen by which task the instruction describes
pub struct MockLlmClient;

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }
}

const MOCK_PROMPTS: [(&str, &str); 4] = [
    (
        "Design a self-paced module that walks new retail associates through handling a frustrated customer, with branching scenarios and reflection questions after each branch.",
        "Branching scenarios for calming frustrated customers.",
    ),
    (
        "Create a short role-play script in which two colleagues practice giving and receiving feedback on the shop floor, including facilitator notes and a debrief checklist.",
        "Peer feedback role play with a debrief checklist.",
    ),
    (
        "Write a microlearning lesson on active listening for front-line staff, ending with a five-question quiz that checks understanding of each technique.",
        "Active listening lesson with a closing quiz.",
    ),
    (
        "Outline a job aid that summarizes the steps for resolving an online order complaint, formatted as a one-page checklist employees can keep at their station.",
        "One-page checklist for online order complaints.",
    ),
];

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        let instruction = &request.instruction;

        if instruction.contains(prompts::PROMPTS_TASK) {
            let items: Vec<serde_json::Value> = MOCK_PROMPTS
                .iter()
                .map(|(prompt, summary)| serde_json::json!({"prompt": prompt, "summary": summary}))
                .collect();
            let reply = if matches!(request.format, ResponseFormat::Json { .. }) {
                serde_json::json!({ "prompts": items }).to_string()
            } else if instruction.contains("```json") {
                let array = serde_json::to_string_pretty(&items)
                    .map_err(|e| ProviderError::MalformedEnvelope(e.to_string()))?;
                format!("Here are your prompts:\n```json\n{}\n```\n", array)
            } else {
                MOCK_PROMPTS
                    .iter()
                    .map(|(prompt, _)| *prompt)
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            Ok(reply)
        } else if instruction.contains(prompts::SUMMARIES_TASK) {
            let summaries: Vec<&str> = MOCK_PROMPTS.iter().map(|(_, summary)| *summary).collect();
            Ok(serde_json::json!({ "summaries": summaries }).to_string())
        } else if instruction.contains(prompts::CONTENT_TASK) {
            Ok("# Module Overview\n\
                \n\
                This module prepares learners to handle difficult conversations.\n\
                \n\
                ## Learning Objectives\n\
                - Recognize signs of customer frustration\n\
                - Apply de-escalation phrases\n"
                .to_string())
        } else {
            Ok(format!(
                "(mock reply after {} earlier turns) {}",
                request.history.len(),
                instruction
            ))
        }
    }
}

/// Test double that replays queued replies in order and records each request
#[derive(Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Convenience for a client that answers once with `text`
    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub async fn push(&self, reply: Result<String, ProviderError>) {
        self.replies.lock().await.push_back(reply);
    }

    pub async fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        self.requests.lock().await.push(request.clone());
        self.replies.lock().await.pop_front().unwrap_or_else(|| {
            Err(ProviderError::MalformedEnvelope(
                "no scripted reply left".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_client_replays_in_order() {
        let client = ScriptedLlmClient::new(vec![
            Ok("first".to_string()),
            Err(ProviderError::Quota("busy".to_string())),
        ]);
        let request = ModelRequest::new("hello", DecodingConfig::default());

        assert_eq!(client.send(&request).await.unwrap(), "first");
        assert!(matches!(
            client.send(&request).await,
            Err(ProviderError::Quota(_))
        ));
        assert!(matches!(
            client.send(&request).await,
            Err(ProviderError::MalformedEnvelope(_))
        ));
        assert_eq!(client.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_scripted_client_through_arc() {
        let client = Arc::new(ScriptedLlmClient::replying("ok"));
        let shared: Box<dyn LlmClient> = Box::new(client.clone());
        let request = ModelRequest::new("hi", DecodingConfig::default())
            .with_history(vec![Turn::user("before"), Turn::model("reply")]);
        assert_eq!(shared.send(&request).await.unwrap(), "ok");
        assert_eq!(client.requests().await[0].history.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_client_answers_json_when_asked() {
        let request = ModelRequest::new(
            format!("Generate 4 {}", prompts::PROMPTS_TASK),
            DecodingConfig::default(),
        )
        .with_format(ResponseFormat::Json {
            schema: serde_json::json!({}),
        });
        let reply = MockLlmClient::new().send(&request).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["prompts"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_turn_serialization() {
        let json = serde_json::to_value(Turn::model("hi")).unwrap();
        assert_eq!(json["role"], "model");
        assert_eq!(json["content"], "hi");
    }
}
