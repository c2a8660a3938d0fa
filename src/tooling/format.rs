//! Text rendering for CLI output.

use crate::config::ValidationResult;
use crate::paging::CollectionState;
use crate::tree::TreeNode;
use crate::types::CacheKey;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Indented outline of `(depth, node)` rows in pre-order.
pub fn format_tree_text(rows: &[(usize, TreeNode)]) -> String {
    let mut out = String::new();
    for (depth, node) in rows {
        let marker = match node.collapsible_hint() {
            crate::tree::CollapsibleHint::None => " ",
            crate::tree::CollapsibleHint::Collapsed => "+",
            crate::tree::CollapsibleHint::Expanded => "-",
        };
        out.push_str(&format!(
            "{}{} {} [{}]\n",
            "  ".repeat(*depth),
            marker,
            node.label(),
            node.context_kind()
        ));
    }
    out
}

pub fn format_tree_json(rows: &[(usize, TreeNode)]) -> Result<String, serde_json::Error> {
    let rows: Vec<serde_json::Value> = rows
        .iter()
        .map(|(depth, node)| {
            json!({
                "depth": depth,
                "kind": node.kind(),
                "id": node.id(),
                "label": node.label(),
                "context": node.context_kind(),
                "has_children": node.has_children,
            })
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}

pub fn format_cache_state(states: &[(CacheKey, CollectionState)]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Collection", "Loaded pages", "Total pages", "Items", "Entries"]);
    for (key, state) in states {
        table.add_row(vec![
            key.to_string(),
            state.loaded_pages.to_string(),
            state.total_pages.to_string(),
            state.total_items.to_string(),
            state.cache_size.to_string(),
        ]);
    }
    format!("{}\n\n{}\n", format_section_heading("Paged collections"), table)
}

pub fn format_validation(result: &ValidationResult) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Configuration checks"));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Check", "Result"]);
    for (description, passed) in &result.checks {
        table.add_row(vec![
            description.clone(),
            if *passed { "ok" } else { "failed" }.to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    for error in &result.errors {
        out.push_str(&format!("error: {}\n", error));
    }
    for warning in &result.warnings {
        out.push_str(&format!("warning: {}\n", warning));
    }
    out.push_str(&format!(
        "{}/{} checks passed\n",
        result.passed_checks(),
        result.total_checks()
    ));
    out
}
