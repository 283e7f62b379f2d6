use std::path::Path;

use dpc_lint::{LintDiagnostic, LintSeverity, Linter};

use crate::reader::{read_catalog_files, read_project_config};

/// Lint every catalog file under `input_path` on its own.
///
/// Returns the rendered output and the number of error-level diagnostics.
pub fn run_lint(input_path: &Path, format: &str) -> Result<(String, usize), String> {
    let files = read_catalog_files(input_path)?;
    let config = read_project_config(input_path)?.unwrap_or_default();
    let linter = Linter::new(config.lint.clone());

    let results: Vec<(String, LintDiagnostic)> = files
        .iter()
        .flat_map(|f| {
            linter
                .lint(&f.catalog)
                .into_iter()
                .map(|d| (f.path.clone(), d))
        })
        .collect();
    let error_count = results
        .iter()
        .filter(|(_, d)| d.severity == LintSeverity::Error)
        .count();
    let file_count = files.len();

    match format {
        "json" => {
            let diagnostics: Vec<serde_json::Value> = results
                .iter()
                .map(|(file, d)| {
                    let mut v = serde_json::to_value(d).unwrap_or_default();
                    if let Some(obj) = v.as_object_mut() {
                        obj.insert("file".into(), file.clone().into());
                    }
                    v
                })
                .collect();
            let json = serde_json::to_string_pretty(&serde_json::json!({
                "diagnostics": diagnostics,
                "summary": {
                    "count": results.len(),
                    "errors": error_count,
                    "files": file_count,
                }
            }))
            .map_err(|e| format!("JSON serialization error: {e}"))?;
            Ok((json, error_count))
        }
        "sarif" => {
            let sarif = build_sarif(&results, &linter);
            let json = serde_json::to_string_pretty(&sarif)
                .map_err(|e| format!("SARIF serialization error: {e}"))?;
            Ok((json, error_count))
        }
        _ => {
            let mut lines: Vec<String> = Vec::new();
            if let Some(name) = &config.name {
                let version = config.version.as_deref().unwrap_or("unversioned");
                lines.push(format!("Linting {name} ({version})"));
            }

            for (file, d) in &results {
                lines.push(format!(
                    "{file}: {}[{}] {}: {}",
                    severity_label(d.severity),
                    d.rule,
                    d.location(),
                    d.message
                ));
            }

            let count = results.len();
            let issue_word = if count == 1 { "issue" } else { "issues" };
            let file_word = if file_count == 1 { "file" } else { "files" };
            lines.push(format!(
                "{count} lint {issue_word} ({error_count} errors) in {file_count} {file_word}."
            ));

            Ok((lines.join("\n"), error_count))
        }
    }
}

fn severity_label(severity: LintSeverity) -> &'static str {
    match severity {
        LintSeverity::Error => "error",
        LintSeverity::Warning => "warning",
        LintSeverity::Info => "info",
    }
}

fn sarif_level(severity: LintSeverity) -> &'static str {
    match severity {
        LintSeverity::Error => "error",
        LintSeverity::Warning => "warning",
        LintSeverity::Info => "note",
    }
}

fn build_sarif(results: &[(String, LintDiagnostic)], linter: &Linter) -> serde_json::Value {
    let rule_descriptors: Vec<serde_json::Value> = linter
        .rules()
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id(),
                "shortDescription": { "text": r.description() },
                "defaultConfiguration": { "level": sarif_level(r.default_severity()) }
            })
        })
        .collect();

    let sarif_results: Vec<serde_json::Value> = results
        .iter()
        .map(|(file, d)| {
            serde_json::json!({
                "ruleId": d.rule,
                "level": sarif_level(d.severity),
                "message": { "text": d.message },
                "locations": [{
                    "physicalLocation": {
                        "artifactLocation": { "uri": file }
                    },
                    "logicalLocations": [{
                        "fullyQualifiedName": d.location(),
                        "kind": "member"
                    }]
                }]
            })
        })
        .collect();

    serde_json::json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/main/sarif-2.1/schema/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "dpc-lint",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rule_descriptors
                }
            },
            "results": sarif_results
        }]
    })
}
