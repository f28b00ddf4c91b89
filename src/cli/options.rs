use anyhow::{Context, Result};

use crate::pipeline::collector::{catalog, CatalogField};

fn render_catalog(fields: &[CatalogField]) -> String {
    let mut out = String::new();
    for field in fields {
        out.push_str(&format!("{} (--{}):\n", field.label, field.key.replace('_', "-")));
        for option in field.options {
            out.push_str(&format!("  - {}\n", option));
        }
        out.push('\n');
    }
    out
}

/// Print the option catalog
pub fn run(json: bool) -> Result<()> {
    let fields = catalog();
    if json {
        let text = serde_json::to_string_pretty(&fields).context("failed to serialize catalog")?;
        println!("{}", text);
    } else {
        print!("{}", render_catalog(&fields));
    }
    Ok(())
}
