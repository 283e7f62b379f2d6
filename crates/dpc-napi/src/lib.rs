//! Data product composer Node.js native addon via napi-rs.
//!
//! Used by Node-hosted storage and tooling. All functions take string
//! inputs and return JSON envelope strings.

#[macro_use]
extern crate napi_derive;

use dpc_core::{load_product_to_json, requirements_to_json, suggest_to_json, upgrade_product_to_json};
use dpc_lint::lint_to_json;

/// Level-1 and level-2 suggestions for the entities on the canvas.
///
/// @param catalog_json - catalog `{ entities: { ... } }`
/// @param canvas_keys_json - JSON array of entity keys on the canvas
/// @returns JSON string with `{ success, data?: SuggestionReport, error? }`
#[napi]
pub fn suggest(catalog_json: String, canvas_keys_json: String) -> String {
    suggest_to_json(&catalog_json, &canvas_keys_json)
}

/// Entities the selected entity references that are not on the canvas.
#[napi]
pub fn requirements(catalog_json: String, selected_key: String, canvas_keys_json: String) -> String {
    requirements_to_json(&catalog_json, &selected_key, &canvas_keys_json)
}

/// Rebuild a saved data product and suggest against its canvas.
#[napi(js_name = "loadProduct")]
pub fn load_product(catalog_json: String, product_json: String) -> String {
    load_product_to_json(&catalog_json, &product_json)
}

/// Rewrite a saved data product with stable node ids, e.g. before storing it.
#[napi(js_name = "upgradeProduct")]
pub fn upgrade_product(product_json: String) -> String {
    upgrade_product_to_json(&product_json)
}

/// Lint a catalog.
///
/// @param config_json - `{ rules?: { [ruleId]: "off" | "warn" | "error" } }`, may be empty
/// @returns JSON string with `{ success, data?: LintDiagnostic[], error? }`
#[napi]
pub fn lint(catalog_json: String, config_json: String) -> String {
    lint_to_json(&catalog_json, &config_json)
}
