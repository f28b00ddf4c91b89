use anyhow::{bail, Result};
use tracing::info;

use super::client::{LlmClient, MockLlmClient};
use super::client_impl::{
    GeminiClient, OpenAICompatibleClient, GROQ_BASE_URL, OPENAI_BASE_URL,
};
use super::retry::RetryingClient;
use crate::config::{Config, LlmConfig};

/// Build the provider client named by `llm_config`, without retries
pub fn create_provider_client(llm_config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    let keys = llm_config.credential_pool()?;
    let model = llm_config.model.clone();
    let timeout = llm_config.timeout_secs;

    info!(
        "Using provider {} with model {} ({} key(s))",
        llm_config.provider,
        model,
        keys.len()
    );

    match llm_config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiClient::new(
            keys,
            model,
            llm_config.base_url.clone(),
            timeout,
        )?)),

        "groq" | "openai" => {
            let default_base = if llm_config.provider == "groq" {
                GROQ_BASE_URL
            } else {
                OPENAI_BASE_URL
            };
            let base_url = llm_config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base.to_string());
            Ok(Box::new(OpenAICompatibleClient::new(
                &llm_config.provider,
                keys,
                model,
                base_url,
                timeout,
            )?))
        }

        "openai-compatible" => {
            let Some(base_url) = llm_config.base_url.clone() else {
                bail!("llm.base_url is required for the openai-compatible provider");
            };
            Ok(Box::new(OpenAICompatibleClient::new(
                "openai-compatible",
                keys,
                model,
                base_url,
                timeout,
            )?))
        }

        unknown => bail!("Unknown LLM provider: {}", unknown),
    }
}

/// Create the client the pipeline talks to: the configured provider wrapped in
/// retries, or the canned mock for dry runs.
pub fn create_client(config: &Config, dry_run: bool) -> Result<Box<dyn LlmClient>> {
    if dry_run {
        info!("Dry run: using mock model client");
        return Ok(Box::new(MockLlmClient::new()));
    }

    let provider = create_provider_client(&config.llm)?;
    Ok(Box::new(RetryingClient::new(provider, config.retry.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_dry_run_returns_mock() {
        let client = create_client(&Config::default(), true).unwrap();
        assert_eq!(client.name(), "mock");
    }

    #[test]
    #[serial]
    fn test_gemini_client_from_key_list() {
        env::set_var("TRAINPROMPT_TEST_GEMINI_KEYS", "k1,k2");
        let mut config = Config::default();
        config.llm.api_key_env = Some("TRAINPROMPT_TEST_GEMINI_KEYS".to_string());
        let client = create_client(&config, false).unwrap();
        assert_eq!(client.name(), "gemini");
        env::remove_var("TRAINPROMPT_TEST_GEMINI_KEYS");
    }

    #[test]
    #[serial]
    fn test_missing_key_fails() {
        env::remove_var("TRAINPROMPT_TEST_MISSING_KEY");
        let mut config = Config::default();
        config.set_provider("groq");
        config.llm.api_key_env = Some("TRAINPROMPT_TEST_MISSING_KEY".to_string());
        let err = create_client(&config, false).err().unwrap();
        assert!(err.to_string().contains("TRAINPROMPT_TEST_MISSING_KEY"));
    }

    #[test]
    fn test_openai_compatible_without_key() {
        let mut config = Config::default();
        config.set_provider("openai-compatible");
        config.llm.base_url = Some("http://localhost:11434/v1".to_string());
        let client = create_client(&config, false).unwrap();
        assert_eq!(client.name(), "openai-compatible");
    }

    #[test]
    fn test_openai_compatible_requires_base_url() {
        let mut config = Config::default();
        config.set_provider("openai-compatible");
        assert!(create_provider_client(&config.llm).is_err());
    }

    #[test]
    fn test_unknown_provider() {
        let mut config = Config::default();
        config.llm.provider = "carrier-pigeon".to_string();
        config.llm.api_key_env = Some("none".to_string());
        let err = create_client(&config, false).err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }
}
