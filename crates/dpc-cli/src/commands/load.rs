use std::fs;
use std::path::Path;

use dpc_core::{load_product, save_product, suggest, AttributeMode, CanvasNode, SuggestionReport};

use crate::commands::suggest::render_report;
use crate::reader::{read_catalog, read_product};

pub fn run_load(
    product_path: &Path,
    catalog_path: Option<&Path>,
    upgrade_path: Option<&Path>,
    format: &str,
) -> Result<String, String> {
    let state = read_product(product_path)?;
    let loaded = load_product(&state);

    let suggestions: Option<SuggestionReport> = match catalog_path {
        Some(path) => {
            let catalog = read_catalog(path)?;
            Some(suggest(&loaded.canvas.entity_keys(), &catalog))
        }
        None => None,
    };

    let mut written = None;
    if let Some(out_path) = upgrade_path {
        let json = save_product(&loaded.canvas, &loaded.attributes)
            .to_json_pretty()
            .map_err(|e| e.to_string())?;
        fs::write(out_path, json)
            .map_err(|e| format!("Failed to write {}: {e}", out_path.display()))?;
        written = Some(out_path);
    }

    if format == "json" {
        let output = serde_json::json!({
            "canvas": loaded.canvas,
            "attributes": loaded.attributes,
            "report": loaded.report,
            "suggestions": suggestions,
        });
        return serde_json::to_string_pretty(&output)
            .map_err(|e| format!("JSON serialization error: {e}"));
    }

    let mut lines: Vec<String> = Vec::new();
    let entity_word = if loaded.canvas.len() == 1 { "entity" } else { "entities" };
    let conn_count = loaded.canvas.connections().len();
    let conn_word = if conn_count == 1 { "connection" } else { "connections" };
    let origin = if loaded.report.migrated {
        " (attribute state migrated by field signature)"
    } else {
        ""
    };
    lines.push(format!(
        "Loaded {} {entity_word}, {conn_count} {conn_word}{origin}.",
        loaded.canvas.len()
    ));

    for node in loaded.canvas.nodes() {
        lines.push(render_node(node));
    }

    if !loaded.report.dropped_state.is_empty() {
        lines.push(format!(
            "Discarded attribute state for: {}",
            loaded.report.dropped_state.join(", ")
        ));
    }
    if loaded.report.skipped_relationships > 0 {
        lines.push(format!(
            "Skipped {} relationship(s) with no endpoint on the canvas.",
            loaded.report.skipped_relationships
        ));
    }

    if let Some(report) = &suggestions {
        lines.push(String::new());
        lines.push(render_report(report));
    }
    if let Some(out_path) = written {
        lines.push(format!("Written to {}", out_path.display()));
    }

    Ok(lines.join("\n"))
}

fn render_node(node: &CanvasNode) -> String {
    let names = |mode: AttributeMode| -> Vec<&str> {
        node.fields
            .iter()
            .filter(|f| f.attribute_mode == mode)
            .map(|f| f.name.as_str())
            .collect()
    };
    let mut groups = Vec::new();
    for (label, mode) in [("runtime", AttributeMode::Runtime), ("loadtime", AttributeMode::Loadtime)] {
        let fields = names(mode);
        if !fields.is_empty() {
            groups.push(format!("{label}: {}", fields.join(", ")));
        }
    }
    format!("  {:<8} {:<28} {}", node.id, node.table_name, groups.join(" | "))
}
