//! Rule: entity-key-format
//!
//! Entity keys must be `BASE_`, `CTE_` or `VIEW_` followed by a name. A key
//! without a known prefix is silently treated as BASE and never suggested.

use std::sync::LazyLock;

use dpc_core::Catalog;
use regex::Regex;

use crate::{LintDiagnostic, LintRule, LintSeverity};

static RE_ENTITY_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(BASE|CTE|VIEW)_[A-Za-z][A-Za-z0-9_]*$").unwrap());
static RE_TYPE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(BASE|CTE|VIEW)_").unwrap());

pub struct EntityKeyFormatRule;

impl LintRule for EntityKeyFormatRule {
    fn id(&self) -> &str {
        "entity-key-format"
    }

    fn description(&self) -> &str {
        "Entity keys should be \"BASE_Name\", \"CTE_Name\" or \"VIEW_Name\""
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn check(&self, catalog: &Catalog) -> Vec<LintDiagnostic> {
        catalog
            .iter()
            .filter(|(key, _)| !RE_ENTITY_KEY.is_match(key))
            .map(|(key, _)| {
                let message = if RE_TYPE_PREFIX.is_match(key) {
                    format!("Entity key \"{key}\" should continue with a name starting with a letter")
                } else {
                    format!("Entity key \"{key}\" has no BASE_, CTE_ or VIEW_ prefix and is treated as BASE")
                };
                LintDiagnostic::new(self, key, None, message)
            })
            .collect()
    }
}
