use tracing::{debug, info, warn};

use super::collector::Selection;
use super::normalizer::{self, PromptItem};
use crate::config::{DecodingOverride, GenerationConfig, OutputFormat};
use crate::error::GenerationError;
use crate::llm::client::{LlmClient, ModelRequest, ResponseFormat};
use crate::llm::prompts;
use crate::session::ConversationSession;
use crate::util::preview;

/// Runs one model round trip per operation and owns the count/emptiness policy.
pub struct PromptGenerator {
    client: Box<dyn LlmClient>,
    settings: GenerationConfig,
}

impl PromptGenerator {
    pub fn new(client: Box<dyn LlmClient>, settings: GenerationConfig) -> Self {
        Self { client, settings }
    }

    pub fn with_item_count(mut self, count: usize) -> Self {
        self.settings.item_count = count;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.settings.output_format = format;
        self
    }

    pub fn settings(&self) -> &GenerationConfig {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.client.name()
    }

    async fn call(&self, request: ModelRequest) -> Result<String, GenerationError> {
        debug!(
            "Sending {} chars to {}",
            request.instruction.len(),
            self.client.name()
        );
        let raw = self.client.send(&request).await.map_err(|err| {
            warn!("Model call to {} failed: {}", self.client.name(), err);
            GenerationError::from(err)
        })?;
        debug!("Model reply: {}", preview(&raw, 200));
        Ok(raw)
    }

    /// Generate `item_count` prompts for `selection`.
    ///
    /// An empty extraction or more items than requested is `ExtractionFailed`;
    /// fewer items are returned as-is.
    pub async fn generate_prompts(
        &self,
        selection: &Selection,
        overrides: Option<&DecodingOverride>,
    ) -> Result<Vec<PromptItem>, GenerationError> {
        selection.validate()?;

        let count = self.settings.item_count;
        let format = self.settings.output_format;
        info!(
            "Generating {} prompts for {} / {} ({:?})",
            count, selection.content_type, selection.target_industry, format
        );

        let mut request = ModelRequest::new(
            prompts::prompts_instruction(selection, count, format),
            self.settings.decoding.apply(overrides),
        )
        .with_system(prompts::PROMPT_ENGINEER_SYSTEM);
        if format == OutputFormat::JsonObject {
            request = request.with_format(ResponseFormat::Json {
                schema: prompts::prompts_schema(),
            });
        }

        let raw = self.call(request).await?;
        let items = normalizer::extract_prompt_items(&raw, format)
            .map_err(|e| GenerationError::extraction(e.to_string(), &raw))?;

        if items.is_empty() {
            warn!("No prompts found in model reply: {}", preview(&raw, 200));
            return Err(GenerationError::extraction(
                "model reply contained no prompts",
                &raw,
            ));
        }
        if items.len() > count {
            return Err(GenerationError::extraction(
                format!("expected at most {} prompts, got {}", count, items.len()),
                &raw,
            ));
        }
        if items.len() < count {
            warn!("Requested {} prompts but the model returned {}", count, items.len());
        }

        info!("Extracted {} prompts", items.len());
        Ok(items)
    }

    /// One summary per prompt, in the same order
    pub async fn summarize_prompts(
        &self,
        selection: &Selection,
        prompt_texts: &[String],
    ) -> Result<Vec<String>, GenerationError> {
        selection.validate()?;
        if prompt_texts.is_empty() {
            return Err(GenerationError::invalid_input("no prompts to summarize"));
        }
        if prompt_texts.iter().any(|p| p.trim().is_empty()) {
            return Err(GenerationError::invalid_input("prompts must not be blank"));
        }

        info!("Summarizing {} prompts", prompt_texts.len());
        let mut request = ModelRequest::new(
            prompts::summaries_instruction(selection, prompt_texts),
            self.settings.decoding,
        )
        .with_system(prompts::SUMMARIZER_SYSTEM);
        if self.settings.output_format.is_json() {
            request = request.with_format(ResponseFormat::Json {
                schema: prompts::summaries_schema(),
            });
        }

        let raw = self.call(request).await?;
        let summaries = normalizer::extract_summaries(&raw)
            .map_err(|e| GenerationError::extraction(e.to_string(), &raw))?;

        if summaries.len() != prompt_texts.len() {
            return Err(GenerationError::extraction(
                format!(
                    "expected {} summaries, got {}",
                    prompt_texts.len(),
                    summaries.len()
                ),
                &raw,
            ));
        }
        Ok(summaries)
    }

    /// Expand one chosen prompt into training content, split into lines
    pub async fn generate_content(&self, prompt: &str) -> Result<Vec<String>, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::invalid_input("prompt must not be blank"));
        }

        info!("Generating content for prompt: {}", preview(prompt, 80));
        let request = ModelRequest::new(
            prompts::content_instruction(prompt.trim()),
            self.settings.decoding,
        )
        .with_system(prompts::CONTENT_WRITER_SYSTEM);

        let raw = self.call(request).await?;
        let lines = normalizer::content_lines(&raw);
        if lines.is_empty() {
            return Err(GenerationError::extraction("model returned no content", &raw));
        }
        Ok(lines)
    }

    /// Answer `message` in the context of `session`.
    ///
    /// The exchange is recorded only when the model answers.
    pub async fn chat(
        &self,
        session: &mut ConversationSession,
        message: &str,
    ) -> Result<String, GenerationError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(GenerationError::invalid_input("message must not be blank"));
        }

        debug!(
            "Chat turn in session {} ({} prior turns)",
            session.id(),
            session.len()
        );
        let request = ModelRequest::new(message, self.settings.decoding)
            .with_system(prompts::CHAT_SYSTEM)
            .with_history(session.history());

        let reply = self.call(request).await?;
        let reply = reply.trim().to_string();
        if reply.is_empty() {
            return Err(GenerationError::extraction("model returned an empty reply", ""));
        }
        session.record_exchange(message, reply.clone());
        Ok(reply)
    }
}
