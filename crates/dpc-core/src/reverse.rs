//! What a selected entity still needs before it can be fully wired.

use std::collections::HashSet;

use tracing::debug;

use crate::catalog::Catalog;
use crate::reference::resolve_entity;
use crate::types::{display_name, DependencyMap, EntityType, ReverseDependency};

/// Entities referenced by `selected_key` that are not on the canvas.
///
/// Self-references are ignored. Each requirement carries the dependency map
/// of links from that entity into the selected one, ready for
/// [`crate::canvas::CanvasGraph::materialize_requirement`]. An unknown key or an
/// entity without fields has no requirements.
pub fn resolve_requirements(
    selected_key: &str,
    catalog: &Catalog,
    canvas_keys: &[String],
) -> Vec<ReverseDependency> {
    let Some(entity) = catalog.get(selected_key) else {
        debug!(entity = selected_key, "selected entity not in catalog");
        return Vec::new();
    };
    if entity.fields.is_empty() {
        return Vec::new();
    }

    let candidates: HashSet<&str> = canvas_keys.iter().map(String::as_str).collect();
    let mut resolution = resolve_entity(selected_key, entity, &candidates);

    resolution
        .missing
        .iter()
        .filter(|key| key.as_str() != selected_key)
        .map(|key| {
            let links = resolution.dependency_map.remove(key).unwrap_or_default();
            ReverseDependency {
                entity_key: key.clone(),
                name: display_name(key).to_string(),
                entity_type: EntityType::from_key(key),
                in_catalog: catalog.contains(key),
                dependency_map: DependencyMap::from([(key.clone(), links)]),
            }
        })
        .collect()
}
