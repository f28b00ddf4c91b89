//! trainprompt - Generate training-content prompts with a hosted LLM
//!
//! Turns a five-field selection (content type, audience, delivery method, theme,
//! industry) into detailed content-creation prompts with short summaries. The
//! pipeline builds an instruction, calls the configured provider (Gemini or any
//! OpenAI-compatible API) with retries, extracts structured items from the reply
//! and presents them over a CLI or an HTTP API. A chosen prompt can be expanded
//! into full training content, and a per-session chat keeps bounded memory.

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod session;
pub mod util;
