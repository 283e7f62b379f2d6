//! Catalog linter for the data product composer.
//!
//! The composer engine never fails on a questionable catalog: malformed
//! references are skipped, unknown entities are reported as missing and
//! ambiguous identities fall back to defaults. This crate surfaces those
//! cases as diagnostics through a trait-based rule framework.

mod rules;

use std::collections::HashMap;

use dpc_core::Catalog;
pub use rules::*;
use serde::{Deserialize, Serialize};
use tracing::info;

// ---------------------------------------------------------------------------
// Lint severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    Error,
    Warning,
    Info,
}

// ---------------------------------------------------------------------------
// Lint diagnostic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintDiagnostic {
    pub rule: String,
    pub severity: LintSeverity,
    /// Entity key the finding belongs to.
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl LintDiagnostic {
    pub fn new(rule: &dyn LintRule, entity: &str, field: Option<&str>, message: String) -> Self {
        Self {
            rule: rule.id().into(),
            severity: rule.default_severity(),
            entity: entity.into(),
            field: field.map(str::to_string),
            message,
        }
    }

    /// `Entity.field`, or just the entity key.
    pub fn location(&self) -> String {
        match &self.field {
            Some(field) => format!("{}.{}", self.entity, field),
            None => self.entity.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lint rule trait
// ---------------------------------------------------------------------------

/// Trait that all lint rules must implement.
pub trait LintRule: Send + Sync {
    /// Unique rule identifier (e.g., "dangling-reference").
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    fn default_severity(&self) -> LintSeverity;

    /// Run the rule against a catalog and return diagnostics.
    fn check(&self, catalog: &Catalog) -> Vec<LintDiagnostic>;
}

// ---------------------------------------------------------------------------
// Lint configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    Off,
    #[default]
    Warn,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default)]
    pub rules: HashMap<String, RuleLevel>,
}

impl LintConfig {
    pub fn is_enabled(&self, rule_id: &str) -> bool {
        !matches!(self.rules.get(rule_id), Some(RuleLevel::Off))
    }

    /// The configured severity for a rule, or its default.
    pub fn severity_for(&self, rule: &dyn LintRule) -> LintSeverity {
        match self.rules.get(rule.id()) {
            Some(RuleLevel::Error) => LintSeverity::Error,
            Some(RuleLevel::Warn) | Some(RuleLevel::Off) => LintSeverity::Warning,
            None => rule.default_severity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Linter engine
// ---------------------------------------------------------------------------

pub struct Linter {
    rules: Vec<Box<dyn LintRule>>,
    config: LintConfig,
}

impl Linter {
    /// Create a linter with all built-in rules.
    pub fn new(config: LintConfig) -> Self {
        Self {
            rules: builtin_rules(),
            config,
        }
    }

    pub fn rules(&self) -> &[Box<dyn LintRule>] {
        &self.rules
    }

    /// Run all enabled rules against the catalog.
    pub fn lint(&self, catalog: &Catalog) -> Vec<LintDiagnostic> {
        let mut diagnostics = Vec::new();

        for rule in &self.rules {
            if self.config.is_enabled(rule.id()) {
                let severity = self.config.severity_for(rule.as_ref());
                let mut results = rule.check(catalog);
                for d in &mut results {
                    d.severity = severity;
                }
                diagnostics.extend(results);
            }
        }

        info!(
            entities = catalog.len(),
            diagnostics = diagnostics.len(),
            "catalog linted"
        );
        diagnostics
    }
}

impl Default for Linter {
    fn default() -> Self {
        Self::new(LintConfig::default())
    }
}

pub fn has_errors(diagnostics: &[LintDiagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == LintSeverity::Error)
}

fn builtin_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(MalformedReferenceRule),
        Box::new(DanglingReferenceRule),
        Box::new(BaseWithReferencesRule),
        Box::new(DependencyCycleRule),
        Box::new(SharedFieldSignatureRule),
        Box::new(EntityKeyFormatRule),
    ]
}

// ---------------------------------------------------------------------------
// JSON API
// ---------------------------------------------------------------------------

/// Lint a catalog and return diagnostics in the `{ success, data?, error? }`
/// envelope.
///
/// Input: catalog JSON (blank means an empty catalog), lint config JSON (`{"rules": {...}}`, may be empty)
/// Output: envelope around an array of `LintDiagnostic`
pub fn lint_to_json(catalog_json: &str, config_json: &str) -> String {
    let config: LintConfig = if config_json.trim().is_empty() {
        LintConfig::default()
    } else {
        match serde_json::from_str(config_json) {
            Ok(c) => c,
            Err(e) => {
                let message = format!("Invalid lint config JSON: {e}");
                return dpc_core::ffi::envelope::<(), _>(move || Err(message));
            }
        }
    };
    let catalog_json = catalog_json.to_string();
    dpc_core::ffi::envelope(move || {
        let catalog = dpc_core::ffi::parse_catalog(&catalog_json)?;
        Ok(Linter::new(config).lint(&catalog))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
