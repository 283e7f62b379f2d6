//! Rule: malformed-reference
//!
//! Flags reference strings without an `Entity.field` separator. The engine
//! skips them, so the field silently contributes no dependency.

use dpc_core::{Catalog, FieldRef};

use crate::{LintDiagnostic, LintRule, LintSeverity};

pub struct MalformedReferenceRule;

impl LintRule for MalformedReferenceRule {
    fn id(&self) -> &str {
        "malformed-reference"
    }

    fn description(&self) -> &str {
        "References must have the form \"Entity.field\""
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn check(&self, catalog: &Catalog) -> Vec<LintDiagnostic> {
        let mut diagnostics = Vec::new();

        for (key, entity) in catalog.iter() {
            for (field_name, field) in &entity.fields {
                for reference in field.references() {
                    if FieldRef::parse(reference.raw).is_none() {
                        diagnostics.push(LintDiagnostic::new(
                            self,
                            key,
                            Some(field_name.as_str()),
                            format!(
                                "Reference \"{}\" has no \"Entity.field\" separator and is ignored",
                                reference.raw
                            ),
                        ));
                    }
                }
            }
        }

        diagnostics
    }
}
