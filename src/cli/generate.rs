use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use super::ModelArgs;
use crate::config::OutputFormat;
use crate::pipeline::collector::Selection;
use crate::pipeline::presenter;
use crate::pipeline::PromptItem;

#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Content type, e.g. "Training Modules"
    #[arg(long)]
    pub content_type: String,

    /// Audience type, e.g. "Entry-Level Employees"
    #[arg(long)]
    pub audience_type: String,

    /// Delivery method, e.g. "Self-Paced Learning"
    #[arg(long)]
    pub delivery_method: String,

    /// Content theme, e.g. "Soft Skills"
    #[arg(long)]
    pub content_theme: String,

    /// Target industry, e.g. "Retail and E-commerce"
    #[arg(long)]
    pub target_industry: String,
}

impl From<SelectionArgs> for Selection {
    fn from(args: SelectionArgs) -> Self {
        Selection::new(
            args.content_type,
            args.audience_type,
            args.delivery_method,
            args.content_theme,
            args.target_industry,
        )
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct GenerateOptions {
    /// Number of prompts to request (default: from config)
    #[arg(long)]
    pub count: Option<usize>,

    /// Output structure to request: json-object, json-array or lines
    #[arg(long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Expand prompt N into full content after listing
    #[arg(long)]
    pub expand: Option<usize>,

    /// Print prompts as JSON instead of a numbered list
    #[arg(long)]
    pub json: bool,
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    match value {
        "json-object" => Ok(OutputFormat::JsonObject),
        "json-array" => Ok(OutputFormat::JsonArray),
        "lines" => Ok(OutputFormat::Lines),
        other => Err(format!(
            "unknown format '{}' (expected json-object, json-array or lines)",
            other
        )),
    }
}

pub async fn run(
    model: ModelArgs,
    selection: SelectionArgs,
    options: GenerateOptions,
) -> Result<()> {
    let mut config = model.load_config()?;
    if let Some(count) = options.count {
        info!("CLI override: item_count = {}", count);
        config.generation.item_count = count;
    }
    if let Some(format) = options.format {
        info!("CLI override: output_format = {:?}", format);
        config.generation.output_format = format;
    }
    config.validate()?;

    let selection = Selection::from(selection);
    for field in selection.unknown_fields() {
        warn!(
            "{} is not one of the listed options; sending it as free text",
            field.label()
        );
    }

    let generator = model.build_generator(&config)?;
    let items = generator.generate_prompts(&selection, None).await?;

    if options.json {
        println!("{}", render_json(&items)?);
    } else {
        print!("{}", presenter::render_items(&items));
    }

    if let Some(n) = options.expand {
        let chosen = presenter::select_item(&items, n)?;
        info!("Expanding prompt {}", chosen.index);
        let lines = generator.generate_content(&chosen.prompt).await?;
        println!();
        for line in lines {
            println!("{}", line);
        }
    }

    Ok(())
}

fn render_json(items: &[PromptItem]) -> Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({ "prompts": items }))
        .context("failed to serialize prompts")
}

/// Expand one prompt given on the command line
pub async fn run_content(model: ModelArgs, prompt: String) -> Result<()> {
    let config = model.load_config()?;
    let generator = model.build_generator(&config)?;
    let lines = generator.generate_content(&prompt).await?;
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
