//! Rule: dangling-reference
//!
//! Flags references to an entity the catalog does not define, or to a field
//! the referenced entity does not have. Such a dependency can never be
//! resolved, so the referencing entity never reaches full coverage.

use dpc_core::{Catalog, FieldRef};

use crate::{LintDiagnostic, LintRule, LintSeverity};

pub struct DanglingReferenceRule;

impl LintRule for DanglingReferenceRule {
    fn id(&self) -> &str {
        "dangling-reference"
    }

    fn description(&self) -> &str {
        "Referenced entities and fields must exist in the catalog"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn check(&self, catalog: &Catalog) -> Vec<LintDiagnostic> {
        let mut diagnostics = Vec::new();

        for (key, entity) in catalog.iter() {
            for (field_name, field) in &entity.fields {
                for reference in field.references() {
                    let Some(target) = FieldRef::parse(reference.raw) else {
                        continue;
                    };
                    let message = if !catalog.contains(&target.entity) {
                        format!(
                            "Reference \"{}\" points to entity \"{}\" which is not in the catalog",
                            reference.raw, target.entity
                        )
                    } else if !catalog.has_field(&target.entity, &target.field) {
                        format!(
                            "Reference \"{}\" points to field \"{}\" which \"{}\" does not define",
                            reference.raw, target.field, target.entity
                        )
                    } else {
                        continue;
                    };
                    diagnostics.push(LintDiagnostic::new(self, key, Some(field_name.as_str()), message));
                }
            }
        }

        diagnostics
    }
}
