//! Terminal rendering of extracted prompts and selection of one for expansion.

use super::normalizer::PromptItem;
use crate::error::GenerationError;
use crate::util::preview;

/// Longest label shown for a prompt in a list
pub const LABEL_MAX_CHARS: usize = 100;

/// Short label for one item
pub fn item_label(item: &PromptItem) -> String {
    preview(&item.prompt, LABEL_MAX_CHARS)
}

/// Numbered list of labels, each summary indented beneath its label
pub fn render_items(items: &[PromptItem]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&format!("{}. {}\n", item.index, item_label(item)));
        if let Some(summary) = &item.summary {
            out.push_str(&format!("   {}\n", summary));
        }
    }
    out
}

/// Pick item `n` (1-based)
pub fn select_item(items: &[PromptItem], n: usize) -> Result<&PromptItem, GenerationError> {
    if n == 0 || n > items.len() {
        return Err(GenerationError::invalid_input(format!(
            "no prompt numbered {} (choose 1-{})",
            n,
            items.len()
        )));
    }
    Ok(&items[n - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize, prompt: &str, summary: Option<&str>) -> PromptItem {
        PromptItem {
            index,
            prompt: prompt.to_string(),
            summary: summary.map(str::to_string),
        }
    }

    #[test]
    fn test_render_numbers_and_summaries() {
        let items = vec![
            item(1, "Write a quiz", Some("A quiz.")),
            item(2, "Draft a role play", None),
        ];
        let text = render_items(&items);
        assert_eq!(text, "1. Write a quiz\n   A quiz.\n2. Draft a role play\n");
    }

    #[test]
    fn test_long_label_is_shortened() {
        let long = "x".repeat(150);
        let label = item_label(&item(1, &long, None));
        assert_eq!(label.chars().count(), 100);
        assert!(label.ends_with("..."));
        assert_eq!(&label[..97], &long[..97]);
    }

    #[test]
    fn test_label_at_limit_is_unchanged() {
        let exact = "y".repeat(100);
        assert_eq!(item_label(&item(1, &exact, None)), exact);
    }

    #[test]
    fn test_select_item_bounds() {
        let items = vec![item(1, "a", None), item(2, "b", None)];
        assert_eq!(select_item(&items, 2).unwrap().prompt, "b");
        assert!(select_item(&items, 0).is_err());
        assert!(select_item(&items, 3).is_err());
    }
}
