use anyhow::Result;
use std::env;

use crate::config::{Config, OutputFormat};

const KNOWN_PROVIDERS: &[&str] = &["gemini", "groq", "openai", "openai-compatible"];

struct CheckResult {
    passed: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl CheckResult {
    fn new() -> Self {
        Self {
            passed: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn pass(&mut self, msg: impl Into<String>) {
        self.passed.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
}

pub fn run(config_path: Option<String>) -> Result<()> {
    let mut results = CheckResult::new();

    let config = match Config::load_with_path(config_path.clone()) {
        Ok(config) => {
            let source = config_path.as_deref().unwrap_or("default search path");
            results.pass(format!("Config loaded from {}", source));
            config
        }
        Err(e) => {
            // reported, not propagated, so the summary prints once
            results.error(format!("Failed to load config: {:#}", e));
            print_results(&results);
            return Ok(());
        }
    };

    check_config(&config, &mut results);
    print_results(&results);
    Ok(())
}

fn check_config(config: &Config, results: &mut CheckResult) {
    let llm = &config.llm;
    if KNOWN_PROVIDERS.contains(&llm.provider.as_str()) {
        results.pass(format!(
            "LLM provider: {} (model: {})",
            llm.provider, llm.model
        ));
    } else {
        results.error(format!(
            "Unknown LLM provider '{}' (expected one of: {})",
            llm.provider,
            KNOWN_PROVIDERS.join(", ")
        ));
    }

    check_api_keys(config, results);

    if let Some(ref base_url) = llm.base_url {
        results.pass(format!("Base URL: {}", base_url));
    }

    results.pass(format!(
        "Generation: {} prompts per request, format {:?}",
        config.generation.item_count, config.generation.output_format
    ));
    if config.generation.output_format == OutputFormat::Lines {
        results.warn("Output format 'lines' returns prompts without summaries");
    }

    let retry = &config.retry;
    results.pass(format!(
        "Retry: up to {} retries, {}ms initial delay, {}ms cap, timeout {}s",
        retry.max_retries, retry.initial_delay_ms, retry.max_delay_ms, llm.timeout_secs
    ));
    if retry.max_retries == 0 {
        results.warn("Retries disabled; transient provider errors fail immediately");
    }

    match config.server.bind.parse::<std::net::SocketAddr>() {
        Ok(_) => results.pass(format!("Server bind: {}", config.server.bind)),
        Err(_) => results.error(format!(
            "Server bind '{}' is not a socket address",
            config.server.bind
        )),
    }
}

fn check_api_keys(config: &Config, results: &mut CheckResult) {
    let llm = &config.llm;
    let is_oai_compat = llm.provider == "openai-compatible";
    match llm.api_key_env.as_deref() {
        None => results.pass("No API key configured"),
        Some(env_var) if env_var.eq_ignore_ascii_case("none") => {
            results.pass("No API key needed")
        }
        Some(env_var) => match env::var(env_var) {
            Ok(_) => match llm.credential_pool() {
                Ok(pool) => results.pass(format!("{} holds {} key(s)", env_var, pool.len())),
                Err(_) => results.error(format!("{} is set but holds no usable key", env_var)),
            },
            Err(_) if is_oai_compat => results.warn(format!(
                "{} is not set (OK for local models, needed for gateways)",
                env_var
            )),
            Err(_) => results.error(format!("{} is not set", env_var)),
        },
    }
}

fn print_results(results: &CheckResult) {
    println!();
    for msg in &results.passed {
        println!("  \u{2713} {}", msg);
    }
    for msg in &results.warnings {
        println!("  ! {}", msg);
    }
    for msg in &results.errors {
        println!("  \u{2717} {}", msg);
    }
    println!();
    println!(
        "{} passed, {} warnings, {} errors",
        results.passed.len(),
        results.warnings.len(),
        results.errors.len()
    );
}
