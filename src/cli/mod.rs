pub mod chat;
pub mod config_check;
pub mod generate;
pub mod options;
pub mod serve;

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::config::Config;
use crate::llm::factory;
use crate::pipeline::PromptGenerator;

/// Flags shared by every command that talks to a model
#[derive(Debug, Clone, Default, Args)]
pub struct ModelArgs {
    /// Path to config file (defaults to ./trainprompt.toml or ~/.config/trainprompt/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Override provider (gemini, groq, openai, openai-compatible)
    #[arg(long)]
    pub provider: Option<String>,

    /// Override model name
    #[arg(long)]
    pub model: Option<String>,

    /// Override provider API root
    #[arg(long)]
    pub base_url: Option<String>,

    /// Use canned replies instead of calling a provider
    #[arg(long)]
    pub dry_run: bool,
}

impl ModelArgs {
    /// Load config and apply CLI overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_path(self.config.clone())?;

        if let Some(ref provider) = self.provider {
            info!("CLI override: provider = {}", provider);
            config.set_provider(provider);
        }
        if let Some(ref model) = self.model {
            info!("CLI override: model = {}", model);
            config.llm.model = model.clone();
        }
        if let Some(ref base_url) = self.base_url {
            info!("CLI override: base_url = {}", base_url);
            config.llm.base_url = Some(base_url.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn build_generator(&self, config: &Config) -> Result<PromptGenerator> {
        let client = factory::create_client(config, self.dry_run)?;
        Ok(PromptGenerator::new(client, config.generation.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_overrides_apply_after_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nprovider = \"gemini\"\nmodel = \"gemini-1.5-flash\"\napi_key_env = \"GEMINI_API_KEYS\""
        )
        .unwrap();

        let args = ModelArgs {
            config: Some(file.path().to_string_lossy().to_string()),
            provider: Some("groq".to_string()),
            model: Some("llama-3.1-8b-instant".to_string()),
            ..Default::default()
        };
        let config = args.load_config().unwrap();
        assert_eq!(config.llm.provider, "groq");
        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.llm.api_key_env.as_deref(), Some("GROQ_API_KEY"));
    }

    #[test]
    fn test_openai_compatible_override_needs_base_url() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = ModelArgs {
            config: Some(file.path().to_string_lossy().to_string()),
            provider: Some("openai-compatible".to_string()),
            ..Default::default()
        };
        assert!(args.load_config().is_err());
    }
}
