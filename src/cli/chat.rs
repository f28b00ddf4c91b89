use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::ModelArgs;
use crate::error::GenerationError;
use crate::session::ConversationSession;

fn is_exit(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "/exit" | "/quit")
}

/// What to tell the user when a turn fails but the conversation can go on.
/// `None` ends the session.
fn retry_hint(err: &GenerationError) -> Option<&'static str> {
    match err {
        GenerationError::ProviderUnavailable(_) => Some("Model unavailable, try again."),
        GenerationError::ProviderRejected(_) => {
            Some("The model declined that message, try rephrasing.")
        }
        GenerationError::ExtractionFailed { .. } => {
            Some("The model sent an empty reply, try again.")
        }
        GenerationError::InvalidInput(_) => None,
    }
}

/// Interactive chat over stdin; one session for the whole run
pub async fn run(model: ModelArgs) -> Result<()> {
    let config = model.load_config()?;
    let generator = model.build_generator(&config)?;
    let mut session = ConversationSession::new("cli", config.server.max_session_turns);

    eprintln!("Chatting with {} (type 'exit' to quit)", generator.provider_name());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit(line) {
            break;
        }

        match generator.chat(&mut session, line).await {
            Ok(reply) => println!("{}\n", reply),
            Err(err) => match retry_hint(&err) {
                Some(hint) => {
                    warn!("{}", err);
                    eprintln!("{}", hint);
                }
                None => return Err(err.into()),
            },
        }
    }
    Ok(())
}
