use dpc_core::Catalog;
use dpc_lint::{has_errors, LintConfig, LintSeverity, Linter, RuleLevel};

const BROKEN: &str = include_str!("../../../fixtures/lint/broken.catalog.json");
const CLEAN: &str = include_str!("../../../fixtures/orders.catalog.json");

fn count(diagnostics: &[dpc_lint::LintDiagnostic], rule: &str) -> usize {
    diagnostics.iter().filter(|d| d.rule == rule).count()
}

#[test]
fn every_rule_fires_on_broken_catalog() {
    let catalog = Catalog::from_json(BROKEN).unwrap();
    let results = Linter::default().lint(&catalog);

    assert_eq!(count(&results, "malformed-reference"), 1);
    assert_eq!(count(&results, "dangling-reference"), 2);
    assert_eq!(count(&results, "base-with-references"), 1);
    assert_eq!(count(&results, "dependency-cycle"), 1);
    assert_eq!(count(&results, "shared-field-signature"), 2);
    assert_eq!(count(&results, "entity-key-format"), 1);
    assert!(!has_errors(&results));
}

#[test]
fn config_disables_and_escalates() {
    let catalog = Catalog::from_json(BROKEN).unwrap();
    let mut config = LintConfig::default();
    config.rules.insert("shared-field-signature".into(), RuleLevel::Off);
    config.rules.insert("base-with-references".into(), RuleLevel::Error);

    let results = Linter::new(config).lint(&catalog);
    assert_eq!(results.len(), 6);
    let errors: Vec<_> = results
        .iter()
        .filter(|d| d.severity == LintSeverity::Error)
        .map(|d| d.location())
        .collect();
    assert_eq!(errors, vec!["BASE_Leaky.owner"]);
}

#[test]
fn orders_catalog_is_clean() {
    let catalog = Catalog::from_json(CLEAN).unwrap();
    assert!(Linter::default().lint(&catalog).is_empty());
}
