//! Rule: shared-field-signature
//!
//! Products saved without stable node ids are re-anchored by field-name set.
//! Entities with identical field sets are indistinguishable to that
//! migration, so saved attribute state may land on either of them.

use std::collections::BTreeMap;

use dpc_core::Catalog;

use crate::{LintDiagnostic, LintRule, LintSeverity};

pub struct SharedFieldSignatureRule;

impl LintRule for SharedFieldSignatureRule {
    fn id(&self) -> &str {
        "shared-field-signature"
    }

    fn description(&self) -> &str {
        "Entities with identical field sets are ambiguous when migrating legacy products"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Info
    }

    fn check(&self, catalog: &Catalog) -> Vec<LintDiagnostic> {
        let mut groups: BTreeMap<Vec<&str>, Vec<&str>> = BTreeMap::new();
        for (key, entity) in catalog.iter() {
            if entity.fields.is_empty() {
                continue;
            }
            groups.entry(entity.field_names().collect()).or_default().push(key);
        }

        groups
            .into_values()
            .filter(|keys| keys.len() > 1)
            .flat_map(|keys| {
                let first = keys[0];
                keys.into_iter().skip(1).map(move |key| {
                    LintDiagnostic::new(
                        self,
                        key,
                        None,
                        format!(
                            "Entity \"{key}\" has the same fields as \"{first}\"; \
                             legacy attribute state cannot tell them apart"
                        ),
                    )
                })
            })
            .collect()
    }
}
