//! Field-level reference resolution.
//!
//! Classifies each `"Entity.Field"` reference of a field as resolved (its
//! entity is in the candidate set) or missing, and records every well-formed
//! reference as a [`DependencyLink`] so the dependency map can be built even
//! for entities that turn out to be missing.

use std::collections::HashSet;

use tracing::debug;

use crate::types::{DependencyLink, DependencyMap, EntityDef, FieldDef, FieldRef};

/// One recorded reference: the referenced entity and the link it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDetail {
    pub entity_key: String,
    pub link: DependencyLink,
}

/// Result of resolving a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldResolution {
    /// Distinct referenced entities present in the candidate set, first-seen order.
    pub resolved: Vec<String>,
    /// Distinct referenced entities absent from the candidate set.
    pub missing: Vec<String>,
    pub details: Vec<ReferenceDetail>,
    /// Reference strings without a `.` separator. Not classified.
    pub malformed: Vec<String>,
}

/// Result of resolving every field of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityResolution {
    pub resolved: Vec<String>,
    pub missing: Vec<String>,
    pub dependency_map: DependencyMap,
    pub malformed: Vec<String>,
}

impl EntityResolution {
    /// Number of distinct referenced entities.
    pub fn referenced_count(&self) -> usize {
        self.resolved.len() + self.missing.len()
    }

    /// Share of distinct referenced entities that resolved, rounded to a
    /// whole percent.
    ///
    /// Rounding never reports 0 while something resolved, nor 100 while
    /// something is missing.
    pub fn coverage_percent(&self) -> u8 {
        let resolved = self.resolved.len();
        let total = self.referenced_count();
        if total == 0 {
            return 0;
        }
        // round-half-up of 100 * resolved / total
        let rounded = (200 * resolved + total) / (2 * total);
        let bounded = match (resolved, self.missing.len()) {
            (0, _) => 0,
            (_, 0) => 100,
            _ => rounded.clamp(1, 99),
        };
        bounded as u8
    }
}

/// Classify one field's references against `candidates`.
///
/// A reference to `entity_key` itself is classified like any other: it is
/// missing unless the entity is a candidate. Callers that must ignore
/// self-references filter them out, as the reverse resolver does.
pub fn resolve_field(
    entity_key: &str,
    field_name: &str,
    field: &FieldDef,
    candidates: &HashSet<&str>,
) -> FieldResolution {
    let mut out = FieldResolution::default();
    let target_field = format!("{entity_key}.{field_name}");

    for reference in field.references() {
        let Some(parsed) = FieldRef::parse(reference.raw) else {
            debug!(
                entity = entity_key,
                field = field_name,
                reference = reference.raw,
                "skipping reference without entity separator"
            );
            out.malformed.push(reference.raw.to_string());
            continue;
        };

        if candidates.contains(parsed.entity.as_str()) {
            push_unique(&mut out.resolved, &parsed.entity);
        } else {
            push_unique(&mut out.missing, &parsed.entity);
        }

        out.details.push(ReferenceDetail {
            link: DependencyLink {
                source_field: reference.raw.to_string(),
                target_field: target_field.clone(),
                connection_type: reference.connection_type,
                calculation: reference.expression.map(str::to_string),
            },
            entity_key: parsed.entity,
        });
    }

    out
}

pub fn resolve_entity(
    entity_key: &str,
    entity: &EntityDef,
    candidates: &HashSet<&str>,
) -> EntityResolution {
    let mut out = EntityResolution::default();

    for (field_name, field) in &entity.fields {
        let field_resolution = resolve_field(entity_key, field_name, field, candidates);
        for key in &field_resolution.resolved {
            push_unique(&mut out.resolved, key);
        }
        for key in &field_resolution.missing {
            push_unique(&mut out.missing, key);
        }
        for detail in field_resolution.details {
            out.dependency_map
                .entry(detail.entity_key)
                .or_default()
                .push(detail.link);
        }
        out.malformed.extend(field_resolution.malformed);
    }

    out
}

fn push_unique(list: &mut Vec<String>, key: &str) {
    if !list.iter().any(|k| k == key) {
        list.push(key.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Calculation, ConnectionType};
    use std::collections::BTreeMap;

    fn field(refs: &[&str]) -> FieldDef {
        FieldDef {
            refs: Some(refs.iter().map(|s| s.to_string()).collect()),
            ..FieldDef::default()
        }
    }

    #[test]
    fn classify_resolved_and_missing() {
        let candidates: HashSet<&str> = ["BASE_Customers"].into_iter().collect();
        let f = field(&["BASE_Customers.id", "BASE_Products.sku"]);
        let r = resolve_field("CTE_Orders", "line", &f, &candidates);
        assert_eq!(r.resolved, vec!["BASE_Customers"]);
        assert_eq!(r.missing, vec!["BASE_Products"]);
        assert_eq!(r.details.len(), 2);
        assert_eq!(r.details[1].entity_key, "BASE_Products");
        assert_eq!(r.details[1].link.source_field, "BASE_Products.sku");
        assert_eq!(r.details[1].link.target_field, "CTE_Orders.line");
    }

    #[test]
    fn calculation_refs_carry_expression() {
        let candidates: HashSet<&str> = HashSet::new();
        let f = FieldDef {
            calculation: Some(Calculation {
                refs: Some(vec!["BASE_Products.price".into()]),
                expression: "price * qty".into(),
            }),
            ..FieldDef::default()
        };
        let r = resolve_field("CTE_Orders", "total", &f, &candidates);
        assert_eq!(r.missing, vec!["BASE_Products"]);
        let link = &r.details[0].link;
        assert_eq!(link.connection_type, ConnectionType::Calculation);
        assert_eq!(link.calculation.as_deref(), Some("price * qty"));
    }

    #[test]
    fn malformed_reference_is_skipped() {
        let candidates: HashSet<&str> = ["BASE_A"].into_iter().collect();
        let f = field(&["BASE_A", "BASE_A.x"]);
        let r = resolve_field("CTE_B", "y", &f, &candidates);
        assert_eq!(r.malformed, vec!["BASE_A"]);
        assert_eq!(r.resolved, vec!["BASE_A"]);
        assert_eq!(r.details.len(), 1);
    }

    #[test]
    fn entity_counts_distinct_entities() {
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), field(&["BASE_X.a", "BASE_X.b"]));
        fields.insert("b".to_string(), field(&["BASE_X.c", "BASE_Y.a"]));
        let entity = EntityDef {
            alias: None,
            fields,
        };
        let candidates: HashSet<&str> = ["BASE_X"].into_iter().collect();
        let r = resolve_entity("CTE_Z", &entity, &candidates);
        assert_eq!(r.resolved, vec!["BASE_X"]);
        assert_eq!(r.missing, vec!["BASE_Y"]);
        assert_eq!(r.dependency_map["BASE_X"].len(), 3);
        assert_eq!(r.dependency_map["BASE_Y"].len(), 1);
        assert_eq!(r.coverage_percent(), 50);
    }

    #[test]
    fn coverage_rounding_stays_inside_bounds() {
        let mut r = EntityResolution {
            resolved: vec!["A".into()],
            missing: (0..300).map(|i| format!("M{i}")).collect(),
            ..EntityResolution::default()
        };
        assert_eq!(r.coverage_percent(), 1);

        r.resolved = (0..300).map(|i| format!("R{i}")).collect();
        r.missing = vec!["M".into()];
        assert_eq!(r.coverage_percent(), 99);

        r.missing.clear();
        assert_eq!(r.coverage_percent(), 100);
    }

    #[test]
    fn coverage_rounds_half_up() {
        let r = EntityResolution {
            resolved: vec!["A".into(), "B".into()],
            missing: vec!["C".into()],
            ..EntityResolution::default()
        };
        // 66.67 → 67
        assert_eq!(r.coverage_percent(), 67);

        let r = EntityResolution {
            resolved: vec!["A".into()],
            missing: vec!["B".into(), "C".into(), "D".into(), "E".into(), "F".into(), "G".into(), "H".into()],
            ..EntityResolution::default()
        };
        // 12.5 → 13
        assert_eq!(r.coverage_percent(), 13);
    }
}
