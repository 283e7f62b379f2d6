use std::path::Path;

use dpc_core::{resolve_requirements, ConnectionType, DependencyLink};

use crate::commands::suggest::warn_unknown_keys;
use crate::reader::read_catalog;

pub fn run_requires(
    catalog_path: &Path,
    entity: &str,
    canvas: &[String],
    format: &str,
) -> Result<String, String> {
    let catalog = read_catalog(catalog_path)?;
    if !catalog.contains(entity) {
        return Err(format!("Entity \"{entity}\" is not defined in the catalog"));
    }
    warn_unknown_keys(&catalog, canvas);

    let requirements = resolve_requirements(entity, &catalog, canvas);

    if format == "json" {
        return serde_json::to_string_pretty(&requirements)
            .map_err(|e| format!("JSON serialization error: {e}"));
    }

    if requirements.is_empty() {
        return Ok(format!("{entity} has everything it references on the canvas."));
    }

    let word = if requirements.len() == 1 { "entity" } else { "entities" };
    let mut lines = vec![format!(
        "{entity} requires {} {word} not on the canvas:",
        requirements.len()
    )];
    for req in &requirements {
        let note = if req.in_catalog { "" } else { "  (not in catalog)" };
        lines.push(format!("  {} ({}){note}", req.entity_key, req.entity_type));
        for link in req.dependency_map.values().flatten() {
            lines.push(format!("    {}", render_link(link)));
        }
    }
    Ok(lines.join("\n"))
}

fn render_link(link: &DependencyLink) -> String {
    let kind = match (&link.connection_type, &link.calculation) {
        (ConnectionType::Calculation, Some(expr)) => format!("calculation: {expr}"),
        (ConnectionType::Calculation, None) => "calculation".into(),
        (ConnectionType::Ref, _) => "ref".into(),
    };
    format!("{} -> {} [{kind}]", link.source_field, link.target_field)
}
