//! Response extraction: pull structured prompt items out of free-form model output.
//!
//! JSON replies are located in order: a fenced code block, the whole body, then the
//! first embedded value that has the expected shape. A fenced block that does not
//! parse is an error rather than a fallthrough, since the model clearly tried to
//! answer in JSON. Line splitting is kept for the plain-list output format.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::OutputFormat;
use crate::error::ExtractionError;

/// A structured unit extracted from a model reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptItem {
    /// 1-based position in the reply
    pub index: usize,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawItem {
    Text(String),
    Object {
        #[serde(alias = "detailed_prompt")]
        prompt: String,
        #[serde(default)]
        summary: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    List(Vec<RawItem>),
    Wrapped { prompts: Vec<RawItem> },
}

impl Payload {
    fn into_items(self) -> Vec<RawItem> {
        match self {
            Payload::List(items) | Payload::Wrapped { prompts: items } => items,
        }
    }
}

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:#{1,6}|[*\-•]|\d{1,2}[.)])\s+").expect("valid list marker regex"));

static LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\*{0,2}([^:*]{1,40}?)\*{0,2}\s*:\s*\*{0,2}(?:\s+(\S.*))?$")
        .expect("valid label regex")
});

/// Labels longer than this are treated as prose that happens to contain a colon
const MAX_LABEL_WORDS: usize = 4;

/// Extract prompt items using the strategy that matches `format`.
///
/// Returns an empty list when the reply holds no JSON at all (JSON formats);
/// the caller decides whether that is acceptable.
pub fn extract_prompt_items(
    raw: &str,
    format: OutputFormat,
) -> Result<Vec<PromptItem>, ExtractionError> {
    match format {
        OutputFormat::JsonObject | OutputFormat::JsonArray => extract_json_items(raw),
        OutputFormat::Lines => Ok(split_lines(raw)
            .into_iter()
            .enumerate()
            .map(|(i, prompt)| PromptItem {
                index: i + 1,
                prompt,
                summary: None,
            })
            .collect()),
    }
}

fn extract_json_items(raw: &str) -> Result<Vec<PromptItem>, ExtractionError> {
    let Some(value) = locate_json(raw, |v| {
        matches!(
            serde_json::from_value::<Payload>(v.clone()),
            Ok(Payload::List(items)) | Ok(Payload::Wrapped { prompts: items }) if !items.is_empty()
        )
    })?
    else {
        debug!("No JSON block found in model output");
        return Ok(Vec::new());
    };

    let payload: Payload = serde_json::from_value(value).map_err(|_| {
        ExtractionError::Schema(
            "expected an array of prompts or an object with a \"prompts\" array".to_string(),
        )
    })?;

    payload
        .into_items()
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let (prompt, summary) = match item {
                RawItem::Text(prompt) => (prompt, None),
                RawItem::Object { prompt, summary } => (prompt, summary),
            };
            let prompt = prompt.trim().to_string();
            if prompt.is_empty() {
                return Err(ExtractionError::Schema(format!("item {} has an empty prompt", i + 1)));
            }
            let summary = summary
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            Ok(PromptItem {
                index: i + 1,
                prompt,
                summary,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SummaryPayload {
    List(Vec<String>),
    Wrapped { summaries: Vec<String> },
}

/// Extract summaries: an array of strings or an object with a "summaries" array.
pub fn extract_summaries(raw: &str) -> Result<Vec<String>, ExtractionError> {
    let Some(value) = locate_json(raw, |v| {
        matches!(
            serde_json::from_value::<SummaryPayload>(v.clone()),
            Ok(SummaryPayload::List(list)) | Ok(SummaryPayload::Wrapped { summaries: list })
                if !list.is_empty()
        )
    })?
    else {
        return Ok(Vec::new());
    };

    let list = match serde_json::from_value::<SummaryPayload>(value) {
        Ok(SummaryPayload::List(list)) | Ok(SummaryPayload::Wrapped { summaries: list }) => list,
        Err(_) => {
            return Err(ExtractionError::Schema(
                "expected a list of summary strings".to_string(),
            ))
        }
    };
    Ok(list.into_iter().map(|s| s.trim().to_string()).collect())
}

/// Find the JSON value in `raw`.
///
/// `accept` filters embedded candidates only; a fenced block or a fully-JSON body
/// is returned as-is so shape errors surface instead of being skipped. Callers
/// reject empty lists so a stray `[]` in prose does not hide the real payload.
fn locate_json(raw: &str, accept: impl Fn(&Value) -> bool) -> Result<Option<Value>, ExtractionError> {
    if let Some(body) = fenced_block(raw) {
        return serde_json::from_str::<Value>(body)
            .map(Some)
            .map_err(|e| ExtractionError::Malformed(e.to_string()));
    }

    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_array() || value.is_object() {
            return Ok(Some(value));
        }
    }

    for (pos, ch) in raw.char_indices() {
        if ch != '[' && ch != '{' {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&raw[pos..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            if accept(&value) {
                debug!("Found embedded JSON at byte offset {}", pos);
                return Ok(Some(value));
            }
        }
    }

    Ok(None)
}

/// Body of the first fenced code block that holds JSON.
///
/// A ```json fence always counts; a bare ``` fence counts only when its body
/// starts like JSON. An unterminated fence runs to the end of the text.
fn fenced_block(raw: &str) -> Option<&str> {
    if let Some(start) = find_ascii_case_insensitive(raw, "```json") {
        let body_start = start + "```json".len();
        let rest = &raw[body_start..];
        let body = match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
        return Some(body.trim());
    }

    let mut search_from = 0;
    while let Some(offset) = raw[search_from..].find("```") {
        let open = search_from + offset + 3;
        let rest = &raw[open..];
        let end = rest.find("```")?;
        let inner = rest[..end].trim();
        if inner.starts_with('[') || inner.starts_with('{') {
            return Some(inner);
        }
        search_from = open + end + 3;
    }
    None
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Split a plain-list reply into one entry per non-blank line.
///
/// Leading list markers (`* `, `- `, `1. `, `## `) are dropped, as is a short
/// `label: ` prefix. Lines that are only a short label are skipped.
pub fn split_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let line = LIST_MARKER.replace(line, "");
            match LABEL_PREFIX.captures(&line) {
                Some(caps) if is_short_label(&caps[1]) => caps
                    .get(2)
                    .map(|rest| rest.as_str().trim().to_string())
                    .filter(|rest| !rest.is_empty()),
                _ => Some(line.trim().to_string()),
            }
        })
        .collect()
}

fn is_short_label(label: &str) -> bool {
    let label = label.trim();
    !label.is_empty()
        && label.split_whitespace().count() <= MAX_LABEL_WORDS
        && !label.contains(['.', ',', '?', '!'])
}

/// Split generated content into display lines, keeping interior blank lines.
pub fn content_lines(raw: &str) -> Vec<String> {
    let lines: Vec<&str> = raw.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(start, |i| i + 1);
    lines[start..end].iter().map(|l| l.to_string()).collect()
}
