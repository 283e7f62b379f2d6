//! Data product composer WASM bindings for the browser canvas.
//!
//! All functions take string inputs and return JSON strings of the form
//! `{ success: boolean, data?: ..., error?: string }`.

use dpc_core::{load_product_to_json, requirements_to_json, suggest_to_json, upgrade_product_to_json};
use dpc_lint::lint_to_json;
use wasm_bindgen::prelude::*;

/// Level-1 and level-2 suggestions for the entities on the canvas.
///
/// @param catalog_json - catalog `{ entities: { ... } }`
/// @param canvas_keys_json - JSON array of entity keys on the canvas
/// @returns JSON string with `{ success, data?: SuggestionReport, error? }`
#[wasm_bindgen(js_name = "suggest")]
pub fn wasm_suggest(catalog_json: &str, canvas_keys_json: &str) -> String {
    suggest_to_json(catalog_json, canvas_keys_json)
}

/// Entities the selected entity references that are not on the canvas.
///
/// @param catalog_json - catalog `{ entities: { ... } }`
/// @param selected_key - key of the selected canvas entity
/// @param canvas_keys_json - JSON array of entity keys on the canvas
/// @returns JSON string with `{ success, data?: ReverseDependency[], error? }`
#[wasm_bindgen(js_name = "requirements")]
pub fn wasm_requirements(catalog_json: &str, selected_key: &str, canvas_keys_json: &str) -> String {
    requirements_to_json(catalog_json, selected_key, canvas_keys_json)
}

/// Rebuild a saved data product and suggest against its canvas.
///
/// @returns JSON string with `{ success, data?: { canvas, attributes, report, suggestions }, error? }`
#[wasm_bindgen(js_name = "loadProduct")]
pub fn wasm_load_product(catalog_json: &str, product_json: &str) -> String {
    load_product_to_json(catalog_json, product_json)
}

/// Rewrite a saved data product with stable node ids.
#[wasm_bindgen(js_name = "upgradeProduct")]
pub fn wasm_upgrade_product(product_json: &str) -> String {
    upgrade_product_to_json(product_json)
}

/// Lint a catalog.
///
/// @param config_json - `{ rules?: { [ruleId]: "off" | "warn" | "error" } }`, may be empty
/// @returns JSON string with `{ success, data?: LintDiagnostic[], error? }`
#[wasm_bindgen(js_name = "lint")]
pub fn wasm_lint(catalog_json: &str, config_json: &str) -> String {
    lint_to_json(catalog_json, config_json)
}
