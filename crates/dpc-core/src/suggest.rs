//! Derivable-entity suggestions.
//!
//! Level 1 suggests CTE/VIEW entities that can be partially or fully built
//! from what is on the canvas. Level 2 suggests entities that build on a
//! level-1 suggestion, treating the level-1 keys as if they were on canvas.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::reference::{resolve_entity, EntityResolution};
use crate::types::{display_name, EntitySummary, EntityType, Suggestion, SuggestionLevel};

/// Why a suggestion report is empty, or that it is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionStatus {
    Ready,
    NoCatalog,
    NoCanvas,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionReport {
    pub status: SuggestionStatus,
    pub level1: Vec<Suggestion>,
    pub level2: Vec<Suggestion>,
}

impl SuggestionReport {
    fn empty(status: SuggestionStatus) -> Self {
        Self {
            status,
            level1: Vec::new(),
            level2: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.level1.is_empty() && self.level2.is_empty()
    }

    /// Level-1 suggestions followed by level-2.
    pub fn all(&self) -> impl Iterator<Item = &Suggestion> {
        self.level1.iter().chain(self.level2.iter())
    }

    pub fn find(&self, entity_key: &str) -> Option<&Suggestion> {
        self.all().find(|s| s.entity_key == entity_key)
    }
}

/// Compute both suggestion levels for the current canvas.
///
/// An empty catalog or canvas yields an empty report whose status says which
/// input was absent.
pub fn suggest(canvas_keys: &[String], catalog: &Catalog) -> SuggestionReport {
    if catalog.is_empty() {
        debug!("no catalog entities, nothing to suggest");
        return SuggestionReport::empty(SuggestionStatus::NoCatalog);
    }
    if canvas_keys.is_empty() {
        debug!("canvas is empty, nothing to suggest");
        return SuggestionReport::empty(SuggestionStatus::NoCanvas);
    }

    let level1 = compute_level1(canvas_keys, catalog);
    let level2 = compute_level2(canvas_keys, &level1, catalog);
    info!(
        canvas = canvas_keys.len(),
        level1 = level1.len(),
        level2 = level2.len(),
        "suggestions computed"
    );

    SuggestionReport {
        status: SuggestionStatus::Ready,
        level1,
        level2,
    }
}

/// Entities buildable, at least in part, from canvas entities alone.
pub fn compute_level1(canvas_keys: &[String], catalog: &Catalog) -> Vec<Suggestion> {
    let candidates: HashSet<&str> = canvas_keys.iter().map(String::as_str).collect();

    let suggestions = catalog
        .derived()
        .filter(|(key, entity)| !candidates.contains(key) && !entity.fields.is_empty())
        .filter_map(|(key, entity)| {
            let resolution = resolve_entity(key, entity, &candidates);
            if resolution.resolved.is_empty() {
                return None;
            }
            Some(build_suggestion(key, SuggestionLevel::Direct, resolution))
        })
        .collect();

    finalize(suggestions)
}

/// Entities that build on at least one level-1 suggestion.
///
/// The candidate pool is the canvas plus every level-1 key. An entity that
/// resolves only against canvas entities is level-1 material, not level-2, so
/// at least one resolved entity must be a level-1 key.
pub fn compute_level2(
    canvas_keys: &[String],
    level1: &[Suggestion],
    catalog: &Catalog,
) -> Vec<Suggestion> {
    if level1.is_empty() {
        return Vec::new();
    }

    let level1_keys: HashSet<&str> = level1.iter().map(|s| s.entity_key.as_str()).collect();
    let pool: HashSet<&str> = canvas_keys
        .iter()
        .map(String::as_str)
        .chain(level1_keys.iter().copied())
        .collect();

    let suggestions = catalog
        .derived()
        .filter(|(key, entity)| !pool.contains(key) && !entity.fields.is_empty())
        .filter_map(|(key, entity)| {
            let resolution = resolve_entity(key, entity, &pool);
            let builds_on_level1 = resolution
                .resolved
                .iter()
                .any(|k| level1_keys.contains(k.as_str()));
            if !builds_on_level1 {
                return None;
            }
            Some(build_suggestion(key, SuggestionLevel::Transitive, resolution))
        })
        .collect();

    finalize(suggestions)
}

fn build_suggestion(key: &str, level: SuggestionLevel, resolution: EntityResolution) -> Suggestion {
    let coverage_percent = resolution.coverage_percent();
    Suggestion {
        entity_key: key.to_string(),
        name: display_name(key).to_string(),
        entity_type: EntityType::from_key(key),
        level,
        coverage_percent,
        matching_entities: resolution
            .resolved
            .iter()
            .map(|k| EntitySummary::from_key(k))
            .collect(),
        missing_entities: resolution
            .missing
            .iter()
            .map(|k| EntitySummary::from_key(k))
            .collect(),
        dependency_map: resolution.dependency_map,
    }
}

/// Keep the first suggestion per key, then order by coverage descending and
/// entity key ascending.
fn finalize(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique: Vec<Suggestion> = suggestions
        .into_iter()
        .filter(|s| seen.insert(s.entity_key.clone()))
        .collect();
    unique.sort_by(|a, b| {
        b.coverage_percent
            .cmp(&a.coverage_percent)
            .then_with(|| a.entity_key.cmp(&b.entity_key))
    });
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityDef, FieldDef};

    fn entity(fields: &[(&str, &[&str])]) -> EntityDef {
        EntityDef {
            alias: None,
            fields: fields
                .iter()
                .map(|(name, refs)| {
                    (
                        name.to_string(),
                        FieldDef {
                            refs: (!refs.is_empty())
                                .then(|| refs.iter().map(|r| r.to_string()).collect()),
                            ..FieldDef::default()
                        },
                    )
                })
                .collect(),
        }
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn catalog() -> Catalog {
        [
            ("BASE_Customers", entity(&[("id", &[]), ("email", &[])])),
            ("BASE_Products", entity(&[("sku", &[]), ("price", &[])])),
            (
                "CTE_Orders",
                entity(&[
                    ("customer_id", &["BASE_Customers.id"]),
                    ("sku", &["BASE_Products.sku"]),
                    ("total", &[]),
                ]),
            ),
            ("VIEW_OrderSummary", entity(&[("total", &["CTE_Orders.total"])])),
            ("CTE_Empty", EntityDef::default()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn level1_partial_coverage() {
        let result = compute_level1(&keys(&["BASE_Customers"]), &catalog());
        assert_eq!(result.len(), 1);
        let s = &result[0];
        assert_eq!(s.entity_key, "CTE_Orders");
        assert_eq!(s.level, SuggestionLevel::Direct);
        assert_eq!(s.coverage_percent, 50);
        assert_eq!(s.missing_entities.len(), 1);
        assert_eq!(s.missing_entities[0].name, "Products");
        assert_eq!(s.missing_entities[0].entity_type, EntityType::Base);
        assert!(s.dependency_map.contains_key("BASE_Products"));
    }

    #[test]
    fn self_reference_counts_as_missing() {
        let catalog: Catalog = [
            ("BASE_Customers", entity(&[("id", &[])])),
            (
                "CTE_Tree",
                entity(&[
                    ("id", &["BASE_Customers.id"]),
                    ("parent_id", &["CTE_Tree.id"]),
                ]),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let result = compute_level1(&keys(&["BASE_Customers"]), &catalog);
        assert_eq!(result[0].entity_key, "CTE_Tree");
        assert_eq!(result[0].coverage_percent, 50);
        assert_eq!(result[0].missing_entities[0].key, "CTE_Tree");
    }

    #[test]
    fn level1_skips_canvas_and_empty_entities() {
        let result = compute_level1(&keys(&["BASE_Customers", "CTE_Orders"]), &catalog());
        assert!(result.iter().all(|s| s.entity_key != "CTE_Orders"));
        assert!(result.iter().all(|s| s.entity_key != "CTE_Empty"));
        // CTE_Orders on canvas makes the summary a level-1 candidate
        assert_eq!(result[0].entity_key, "VIEW_OrderSummary");
    }

    #[test]
    fn level2_requires_level1_dependency() {
        let canvas = keys(&["BASE_Customers"]);
        let level1 = compute_level1(&canvas, &catalog());
        let level2 = compute_level2(&canvas, &level1, &catalog());
        assert_eq!(level2.len(), 1);
        assert_eq!(level2[0].entity_key, "VIEW_OrderSummary");
        assert_eq!(level2[0].level, SuggestionLevel::Transitive);
        assert_eq!(level2[0].coverage_percent, 100);

        assert!(compute_level2(&canvas, &[], &catalog()).is_empty());
    }

    #[test]
    fn ties_order_by_key() {
        let catalog: Catalog = [
            ("BASE_A", entity(&[("id", &[])])),
            ("VIEW_Zeta", entity(&[("a", &["BASE_A.id"])])),
            ("CTE_Alpha", entity(&[("a", &["BASE_A.id"])])),
            ("CTE_Half", entity(&[("a", &["BASE_A.id"]), ("b", &["BASE_B.id"])])),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let result = compute_level1(&keys(&["BASE_A"]), &catalog);
        let order: Vec<&str> = result.iter().map(|s| s.entity_key.as_str()).collect();
        assert_eq!(order, vec!["CTE_Alpha", "VIEW_Zeta", "CTE_Half"]);
    }

    #[test]
    fn finalize_keeps_first_duplicate() {
        let mut first = compute_level1(&keys(&["BASE_Customers"]), &catalog());
        let mut second = first.clone();
        second[0].coverage_percent = 99;
        first.extend(second);
        let result = finalize(first);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].coverage_percent, 50);
    }

    #[test]
    fn suggest_reports_absent_input() {
        let report = suggest(&[], &catalog());
        assert_eq!(report.status, SuggestionStatus::NoCanvas);
        assert!(report.is_empty());

        let report = suggest(&keys(&["BASE_Customers"]), &Catalog::default());
        assert_eq!(report.status, SuggestionStatus::NoCatalog);
        assert!(report.is_empty());
    }

    #[test]
    fn suggest_combines_levels() {
        let report = suggest(&keys(&["BASE_Customers"]), &catalog());
        assert_eq!(report.status, SuggestionStatus::Ready);
        let all: Vec<&str> = report.all().map(|s| s.entity_key.as_str()).collect();
        assert_eq!(all, vec!["CTE_Orders", "VIEW_OrderSummary"]);
        assert!(report.find("VIEW_OrderSummary").is_some());
    }
}
