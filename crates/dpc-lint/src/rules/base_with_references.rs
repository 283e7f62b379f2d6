//! Rule: base-with-references
//!
//! BASE entities are sources: they are never suggested, and the links their
//! fields declare are only used when another entity requires them. A BASE
//! field with references usually means the entity should be a CTE or VIEW.

use dpc_core::{Catalog, EntityType};

use crate::{LintDiagnostic, LintRule, LintSeverity};

pub struct BaseWithReferencesRule;

impl LintRule for BaseWithReferencesRule {
    fn id(&self) -> &str {
        "base-with-references"
    }

    fn description(&self) -> &str {
        "BASE entities should not reference other entities"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Info
    }

    fn check(&self, catalog: &Catalog) -> Vec<LintDiagnostic> {
        catalog
            .iter()
            .filter(|(key, _)| EntityType::from_key(key) == EntityType::Base)
            .flat_map(|(key, entity)| {
                entity
                    .fields
                    .iter()
                    .filter(|(_, field)| field.has_references())
                    .map(move |(field_name, _)| {
                        LintDiagnostic::new(
                            self,
                            key,
                            Some(field_name.as_str()),
                            format!(
                                "BASE entity \"{key}\" declares references on \"{field_name}\"; \
                                 it will never be suggested. Consider a CTE_ or VIEW_ key"
                            ),
                        )
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_base_fields_only() {
        let catalog = Catalog::from_json(
            r#"{"entities": {
                "BASE_A": {"fields": {"id": {}, "b": {"ref": ["BASE_B.id"]}}},
                "BASE_B": {"fields": {"id": {}}},
                "CTE_C": {"fields": {"a": {"ref": ["BASE_A.id"]}}}
            }}"#,
        )
        .unwrap();
        let results = BaseWithReferencesRule.check(&catalog);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].location(), "BASE_A.b");
    }

    #[test]
    fn unprefixed_keys_count_as_base() {
        let catalog = Catalog::from_json(
            r#"{"entities": {"orders": {"fields": {"a": {"ref": ["BASE_A.id"]}}}}}"#,
        )
        .unwrap();
        assert_eq!(BaseWithReferencesRule.check(&catalog).len(), 1);
    }
}
