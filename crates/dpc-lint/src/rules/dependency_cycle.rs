//! Rule: dependency-cycle
//!
//! Detects entities that depend on each other in a loop. No member of the
//! loop can be fully covered before the others are on the canvas.
//! Self-references are ignored, as they are by requirement resolution.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use dpc_core::{Catalog, FieldRef};

use crate::{LintDiagnostic, LintRule, LintSeverity};

pub struct DependencyCycleRule;

impl LintRule for DependencyCycleRule {
    fn id(&self) -> &str {
        "dependency-cycle"
    }

    fn description(&self) -> &str {
        "Entities should not depend on each other circularly"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn check(&self, catalog: &Catalog) -> Vec<LintDiagnostic> {
        let adj = dependency_graph(catalog);
        let mut cycles = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();

        for key in adj.keys() {
            if !visited.contains(key) {
                visit(key, &adj, &mut visited, &mut stack, &mut cycles);
            }
        }

        cycles
            .into_iter()
            .map(|chain| {
                LintDiagnostic::new(
                    self,
                    chain[0],
                    None,
                    format!("Circular dependency: {}", chain.join(" → ")),
                )
            })
            .collect()
    }
}

/// Entity key → catalog entities its fields reference, excluding itself.
fn dependency_graph(catalog: &Catalog) -> BTreeMap<&str, BTreeSet<String>> {
    catalog
        .iter()
        .map(|(key, entity)| {
            let targets = entity
                .fields
                .values()
                .flat_map(|field| field.references())
                .filter_map(|r| FieldRef::parse(r.raw))
                .map(|r| r.entity)
                .filter(|target| target != key && catalog.contains(target))
                .collect();
            (key, targets)
        })
        .collect()
}

fn visit<'a>(
    node: &'a str,
    adj: &'a BTreeMap<&'a str, BTreeSet<String>>,
    visited: &mut HashSet<&'a str>,
    stack: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<&'a str>>,
) {
    visited.insert(node);
    stack.push(node);

    if let Some(targets) = adj.get(node) {
        for target in targets {
            let target = target.as_str();
            if !visited.contains(target) {
                visit(target, adj, visited, stack, cycles);
            } else if let Some(start) = stack.iter().position(|n| *n == target) {
                let mut chain = stack[start..].to_vec();
                chain.push(target);
                cycles.push(chain);
            }
        }
    }

    stack.pop();
}
