//! Instruction builders. Each builder is paired with the extractor strategy that
//! reads its reply, so wording changes here must keep the output contract.

use serde_json::json;

use crate::config::OutputFormat;
use crate::pipeline::collector::Selection;

/// Task phrases; the mock client keys off these.
pub const PROMPTS_TASK: &str = "content creation prompts";
pub const SUMMARIES_TASK: &str = "concise summaries";
pub const CONTENT_TASK: &str = "Generate detailed content based on the following prompt";

pub const PROMPT_ENGINEER_SYSTEM: &str = "You are an expert at prompt engineering. Your goal is to write prompts that help trainers create professional, relevant training content. Your users mostly come from the training and consulting industry.";

pub const SUMMARIZER_SYSTEM: &str =
    "You summarize prompts while preserving their context and the user's selections.";

pub const CONTENT_WRITER_SYSTEM: &str = "You generate comprehensive, well-structured training content from a detailed prompt.";

pub const CHAT_SYSTEM: &str = "You are a helpful assistant for trainers designing employee training content.";

fn selection_block(selection: &Selection) -> String {
    selection
        .fields()
        .iter()
        .map(|(field, value)| format!("{} - {}", field.label(), value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_instructions(format: OutputFormat, count: usize) -> String {
    match format {
        OutputFormat::JsonObject => format!(
            "Respond with a JSON object with a single key \"prompts\" holding an array of exactly {count} objects. \
             Each object has a \"prompt\" key (the detailed prompt) and a \"summary\" key (the 2-3 sentence summary). \
             Do not include any text outside the JSON object."
        ),
        OutputFormat::JsonArray => format!(
            "Format your response as a JSON array of exactly {count} objects inside a ```json code block. \
             Each object has a \"prompt\" key (the detailed prompt) and a \"summary\" key (the 2-3 sentence summary). \
             Example:\n```json\n[\n  {{\"prompt\": \"...\", \"summary\": \"...\"}}\n]\n```"
        ),
        OutputFormat::Lines => format!(
            "Write exactly {count} prompts, one per line, with no titles, numbering, headings or blank lines. \
             Do not add any other text."
        ),
    }
}

/// Instruction asking for `count` prompts (and summaries, unless `format` is Lines)
pub fn prompts_instruction(selection: &Selection, count: usize, format: OutputFormat) -> String {
    let per_prompt = if format.is_json() {
        "For each prompt, provide:\n\
         1. A detailed version for content generation, without a title\n\
         2. A brief 2-3 sentence summary for display"
    } else {
        "Each prompt must be a detailed version for content generation, without a title."
    };

    format!(
        "Generate {count} distinct {PROMPTS_TASK} to help trainers who train employees generate content based on the following inputs:\n\
         {selection}\n\n\
         The prompts should be designed so that trainers can generate content relevant to the given Content Type, \
         Audience Type, Delivery Method, Content Theme and Target Industry.\n\n\
         {per_prompt}\n\n\
         {format}",
        selection = selection_block(selection),
        format = format_instructions(format, count),
    )
}

/// Instruction asking for one summary per prompt, in order, as `{"summaries": [...]}`
pub fn summaries_instruction(selection: &Selection, prompts: &[String]) -> String {
    let numbered = prompts
        .iter()
        .enumerate()
        .map(|(i, prompt)| format!("{}. {}", i + 1, prompt))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Write {count} {SUMMARIES_TASK} of 2-3 sentences, one for each of the following prompts, \
         while maintaining their context.\n\n\
         The user selections are:\n{selection}\n\n\
         Prompts:\n{numbered}\n\n\
         Respond with a JSON object with a single key \"summaries\" holding an array of exactly {count} strings, \
         in the same order as the prompts. Do not include any text outside the JSON object.",
        count = prompts.len(),
        selection = selection_block(selection),
    )
}

/// Instruction expanding one chosen prompt into full training content
pub fn content_instruction(prompt: &str) -> String {
    format!("{CONTENT_TASK}:\n\n{prompt}")
}

/// Schema for the JsonObject format, in the provider's OpenAPI subset
pub fn prompts_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "prompts": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "prompt": { "type": "STRING" },
                        "summary": { "type": "STRING" }
                    },
                    "required": ["prompt", "summary"]
                }
            }
        },
        "required": ["prompts"]
    })
}

/// Schema for a list of summaries
pub fn summaries_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summaries": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": ["summaries"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retail() -> Selection {
        Selection::new(
            "Training Modules",
            "Entry-Level Employees",
            "Self-Paced Learning",
            "Soft Skills",
            "Retail and E-commerce",
        )
    }

    #[test]
    fn test_prompts_instruction_embeds_every_field() {
        let selection = retail();
        for format in [
            OutputFormat::JsonObject,
            OutputFormat::JsonArray,
            OutputFormat::Lines,
        ] {
            let text = prompts_instruction(&selection, 4, format);
            for (_, value) in selection.fields() {
                assert!(text.contains(value), "{:?} missing {}", format, value);
            }
            assert!(text.contains("Generate 4 distinct"));
            assert!(text.contains(PROMPTS_TASK));
        }
    }

    #[test]
    fn test_free_text_values_embedded_verbatim() {
        let mut selection = retail();
        selection.content_theme = "Negotiation: \"win-win\" deals".to_string();
        let text = prompts_instruction(&selection, 4, OutputFormat::JsonObject);
        assert!(text.contains("Content Theme - Negotiation: \"win-win\" deals"));
    }

    #[test]
    fn test_format_wording_matches_strategy() {
        let selection = retail();
        let object = prompts_instruction(&selection, 4, OutputFormat::JsonObject);
        assert!(object.contains("\"prompts\""));
        assert!(object.contains("exactly 4 objects"));

        let array = prompts_instruction(&selection, 4, OutputFormat::JsonArray);
        assert!(array.contains("```json"));

        let lines = prompts_instruction(&selection, 3, OutputFormat::Lines);
        assert!(lines.contains("one per line"));
        assert!(lines.contains("exactly 3 prompts"));
        assert!(!lines.contains("summary"));
    }

    #[test]
    fn test_prompts_instruction_is_deterministic() {
        let selection = retail();
        assert_eq!(
            prompts_instruction(&selection, 4, OutputFormat::JsonArray),
            prompts_instruction(&selection, 4, OutputFormat::JsonArray)
        );
    }

    #[test]
    fn test_summaries_instruction_numbers_prompts() {
        let prompts = vec!["First prompt".to_string(), "Second prompt".to_string()];
        let text = summaries_instruction(&retail(), &prompts);
        assert!(text.contains("1. First prompt"));
        assert!(text.contains("2. Second prompt"));
        assert!(text.contains("exactly 2 strings"));
        assert!(text.contains("\"summaries\""));
        assert!(text.contains("Retail and E-commerce"));
        assert!(text.contains(SUMMARIES_TASK));
    }

    #[test]
    fn test_content_instruction() {
        let text = content_instruction("Design a quiz");
        assert!(text.starts_with(CONTENT_TASK));
        assert!(text.ends_with("Design a quiz"));
    }

    #[test]
    fn test_schema_requires_prompt_and_summary() {
        let schema = prompts_schema();
        assert_eq!(schema["properties"]["prompts"]["type"], "ARRAY");
        assert_eq!(
            schema["properties"]["prompts"]["items"]["required"],
            json!(["prompt", "summary"])
        );
    }
}
