use std::path::Path;

use dpc_core::{suggest, Catalog, Suggestion, SuggestionReport, SuggestionStatus};
use tracing::warn;

use crate::reader::read_catalog;

pub fn run_suggest(catalog_path: &Path, canvas: &[String], format: &str) -> Result<String, String> {
    let catalog = read_catalog(catalog_path)?;
    warn_unknown_keys(&catalog, canvas);

    let report = suggest(canvas, &catalog);

    match format {
        "json" => serde_json::to_string_pretty(&report)
            .map_err(|e| format!("JSON serialization error: {e}")),
        _ => Ok(render_report(&report)),
    }
}

/// Canvas keys outside the catalog still take part in resolution; they are
/// most likely typos.
pub fn warn_unknown_keys(catalog: &Catalog, canvas: &[String]) {
    for key in canvas.iter().filter(|k| !catalog.contains(k)) {
        warn!(entity = %key, "canvas entity is not defined in the catalog");
    }
}

pub fn render_report(report: &SuggestionReport) -> String {
    match report.status {
        SuggestionStatus::NoCatalog => return "Catalog has no entities.".into(),
        SuggestionStatus::NoCanvas => return "Canvas is empty; nothing to suggest.".into(),
        SuggestionStatus::Ready => {}
    }

    let mut lines: Vec<String> = Vec::new();
    for (title, suggestions) in [("Level 1", &report.level1), ("Level 2", &report.level2)] {
        lines.push(format!("{title} ({})", suggestions.len()));
        for s in suggestions {
            lines.push(render_suggestion(s));
        }
    }

    let count = report.level1.len() + report.level2.len();
    let word = if count == 1 { "suggestion" } else { "suggestions" };
    lines.push(format!("{count} {word}."));
    lines.join("\n")
}

fn render_suggestion(s: &Suggestion) -> String {
    let mut line = format!("  {:<28} {:>3}%", s.entity_key, s.coverage_percent);
    if !s.missing_entities.is_empty() {
        let missing: Vec<String> = s
            .missing_entities
            .iter()
            .map(|m| format!("{} ({})", m.name, m.entity_type))
            .collect();
        line.push_str(&format!("  missing: {}", missing.join(", ")));
    }
    line
}
