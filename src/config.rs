use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::llm::credentials::{CredentialPool, KeySelection};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "gemini", "groq", "openai" or "openai-compatible"
    pub provider: String,
    pub model: String,

    /// Environment variable holding one key or a comma-separated list of keys.
    /// "none" means the provider needs no key (local OpenAI-compatible servers).
    pub api_key_env: Option<String>,

    /// How a key is picked from the pool for each call
    #[serde(default)]
    pub key_selection: KeySelection,

    /// Override the provider's API root (required for openai-compatible)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Hard timeout for a single provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Default model for a provider preset
    pub fn default_model(provider: &str) -> &'static str {
        match provider {
            "groq" => "llama-3.3-70b-versatile",
            "openai" => "gpt-4o",
            "openai-compatible" => "llama3",
            _ => "gemini-1.5-pro",
        }
    }

    /// Default key variable for a provider preset
    pub fn default_api_key_env(provider: &str) -> Option<String> {
        match provider {
            "gemini" => Some("GEMINI_API_KEYS".to_string()),
            "groq" => Some("GROQ_API_KEY".to_string()),
            "openai" => Some("OPENAI_API_KEY".to_string()),
            _ => None,
        }
    }

    /// Build the credential pool from the configured environment variable
    pub fn credential_pool(&self) -> Result<CredentialPool> {
        let Some(env_var) = self.api_key_env.as_deref() else {
            return Ok(CredentialPool::anonymous());
        };

        // "none" means no API key needed (e.g. Ollama)
        if env_var.eq_ignore_ascii_case("none") {
            return Ok(CredentialPool::anonymous());
        }

        match env::var(env_var) {
            Ok(raw) => CredentialPool::from_list(&raw, self.key_selection)
                .with_context(|| format!("no usable API key in {}", env_var)),
            // local gateways may not need a key; hosted presets always do
            Err(_) if self.provider == "openai-compatible" => Ok(CredentialPool::anonymous()),
            Err(_) => bail!("API key not found in environment variable: {}", env_var),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: Self::default_model("gemini").to_string(),
            api_key_env: Self::default_api_key_env("gemini"),
            key_selection: KeySelection::default(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Output structure requested from the model; the extractor must match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Provider-enforced JSON object `{"prompts": [...]}`
    #[default]
    JsonObject,
    /// Free text containing a ```json fenced array
    JsonArray,
    /// One prompt per line
    Lines,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        !matches!(self, OutputFormat::Lines)
    }
}

/// Decoding parameters forwarded to the provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodingConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

/// Per-request override; unset members fall back to the configured defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodingOverride {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

impl DecodingConfig {
    pub fn apply(&self, overrides: Option<&DecodingOverride>) -> Self {
        let Some(o) = overrides else {
            return *self;
        };
        Self {
            temperature: o.temperature.unwrap_or(self.temperature),
            top_p: o.top_p.unwrap_or(self.top_p),
            top_k: o.top_k.unwrap_or(self.top_k),
            max_output_tokens: o.max_output_tokens.unwrap_or(self.max_output_tokens),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Number of prompts requested per selection
    #[serde(default = "default_item_count")]
    pub item_count: usize,

    #[serde(default)]
    pub output_format: OutputFormat,

    #[serde(default)]
    pub decoding: DecodingConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            item_count: default_item_count(),
            output_format: OutputFormat::default(),
            decoding: DecodingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra attempts after the first one, for transient failures only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Oldest turns are dropped once a session holds this many
    #[serde(default = "default_max_session_turns")]
    pub max_session_turns: usize,

    /// Least recently used sessions are evicted past this many
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_session_turns: default_max_session_turns(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    40
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_item_count() -> usize {
    4
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_max_session_turns() -> usize {
    40
}

fn default_max_sessions() -> usize {
    1000
}

impl Config {
    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        // If explicit path provided, use it
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path)
                .with_context(|| format!("failed to load config from {}", config_path));
        }

        // Try working directory first
        if Path::new("trainprompt.toml").exists() {
            debug!("Loading config from ./trainprompt.toml");
            return Self::load_from_path("trainprompt.toml");
        }

        // Try user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("trainprompt").join("config.toml");
            if config_path.exists() {
                debug!("Loading config from {:?}", config_path);
                return Self::load_from_path(&config_path);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.generation.item_count == 0 {
            bail!("generation.item_count must be at least 1");
        }
        if self.llm.provider == "openai-compatible" && self.llm.base_url.is_none() {
            bail!("llm.base_url is required for the openai-compatible provider");
        }
        if self.retry.backoff_multiplier < 1.0 {
            bail!("retry.backoff_multiplier must be >= 1.0");
        }
        if self.server.max_sessions == 0 {
            bail!("server.max_sessions must be at least 1");
        }
        Ok(())
    }

    /// Switch provider preset, resetting model and key variable to its defaults
    pub fn set_provider(&mut self, provider: &str) {
        self.llm.provider = provider.to_string();
        self.llm.model = LlmConfig::default_model(provider).to_string();
        self.llm.api_key_env = LlmConfig::default_api_key_env(provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert_eq!(config.llm.api_key_env.as_deref(), Some("GEMINI_API_KEYS"));
        assert_eq!(config.generation.item_count, 4);
        assert_eq!(config.generation.output_format, OutputFormat::JsonObject);
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.server.max_sessions, 1000);
    }

    #[test]
    fn test_default_decoding() {
        let decoding = DecodingConfig::default();
        assert_eq!(decoding.temperature, 1.0);
        assert_eq!(decoding.top_p, 0.95);
        assert_eq!(decoding.top_k, 40);
        assert_eq!(decoding.max_output_tokens, 8192);
    }

    #[test]
    fn test_decoding_override_merges() {
        let base = DecodingConfig::default();
        let merged = base.apply(Some(&DecodingOverride {
            temperature: Some(0.2),
            top_k: Some(10),
            ..Default::default()
        }));
        assert_eq!(merged.temperature, 0.2);
        assert_eq!(merged.top_k, 10);
        assert_eq!(merged.top_p, 0.95);
        assert_eq!(base.apply(None), base);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string(&Config::default()).unwrap();
        assert!(toml_str.contains("provider = \"gemini\""));
        assert!(toml_str.contains("output_format = \"json-object\""));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[llm]
provider = "groq"
model = "llama-3.3-70b-versatile"
api_key_env = "GROQ_API_KEY"

[generation]
output_format = "lines"
"#,
        )
        .unwrap();
        assert_eq!(config.llm.provider, "groq");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.generation.output_format, OutputFormat::Lines);
        assert_eq!(config.generation.item_count, 4);
        assert_eq!(config.retry.max_retries, 2);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainprompt.toml");
        fs::write(
            &path,
            "[server]\nbind = \"0.0.0.0:9000\"\nmax_session_turns = 10\n",
        )
        .unwrap();
        let config = Config::load_with_path(Some(path.display().to_string())).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.max_session_turns, 10);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load_with_path(Some("/nonexistent/trainprompt.toml".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_items() {
        let mut config = Config::default();
        config.generation.item_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_max_sessions() {
        let mut config = Config::default();
        config.server.max_sessions = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_sessions"));
    }

    #[test]
    fn test_validate_openai_compatible_needs_base_url() {
        let mut config = Config::default();
        config.set_provider("openai-compatible");
        assert!(config.validate().is_err());
        config.llm.base_url = Some("http://localhost:11434/v1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_set_provider_resets_defaults() {
        let mut config = Config::default();
        config.set_provider("groq");
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(config.llm.api_key_env.as_deref(), Some("GROQ_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_credential_pool_from_env_list() {
        env::set_var("TRAINPROMPT_TEST_KEYS", "k1, k2 ,k3");
        let mut config = Config::default();
        config.llm.api_key_env = Some("TRAINPROMPT_TEST_KEYS".to_string());
        let pool = config.llm.credential_pool().unwrap();
        assert_eq!(pool.len(), 3);
        env::remove_var("TRAINPROMPT_TEST_KEYS");
    }

    #[test]
    #[serial]
    fn test_credential_pool_missing_env_fails() {
        let mut config = Config::default();
        config.llm.api_key_env = Some("TRAINPROMPT_NONEXISTENT_KEY_XYZ".to_string());
        let err = config.llm.credential_pool().unwrap_err();
        assert!(err.to_string().contains("API key not found"));
    }

    #[test]
    #[serial]
    fn test_credential_pool_openai_compatible_missing_ok() {
        let mut config = Config::default();
        config.llm.provider = "openai-compatible".to_string();
        config.llm.api_key_env = Some("TRAINPROMPT_NONEXISTENT_KEY_OAI".to_string());
        let pool = config.llm.credential_pool().unwrap();
        assert!(pool.is_anonymous());
    }

    #[test]
    fn test_credential_pool_none_means_anonymous() {
        let mut config = Config::default();
        config.llm.api_key_env = Some("none".to_string());
        assert!(config.llm.credential_pool().unwrap().is_anonymous());
    }
}
