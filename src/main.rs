use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trainprompt::cli;
use trainprompt::cli::generate::{GenerateOptions, SelectionArgs};
use trainprompt::cli::ModelArgs;

#[derive(Parser)]
#[command(name = "trainprompt", version)]
#[command(about = "Generate training-content prompts with a hosted LLM", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[command(flatten)]
        model: ModelArgs,

        /// Address to listen on (default: from config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Generate prompts for one selection
    Generate {
        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        options: GenerateOptions,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Expand a prompt into full training content
    Content {
        /// The prompt to expand
        prompt: String,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Chat with the model over stdin
    Chat {
        #[command(flatten)]
        model: ModelArgs,
    },

    /// List the options for each selection field
    Options {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check configuration and API keys
    ConfigCheck {
        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve { model, bind } => cli::serve::run(model, bind).await?,
        Commands::Generate {
            selection,
            options,
            model,
        } => cli::generate::run(model, selection, options).await?,
        Commands::Content { prompt, model } => cli::generate::run_content(model, prompt).await?,
        Commands::Chat { model } => cli::chat::run(model).await?,
        Commands::Options { json } => cli::options::run(json)?,
        Commands::ConfigCheck { config } => cli::config_check::run(config)?,
    }

    Ok(())
}
