//! FFI-oriented JSON API for the wasm and napi bindings.
//!
//! Every function takes strings and returns a JSON envelope
//! `{ "success": bool, "data"?: ..., "error"?: "..." }`.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::product::{load_product, save_product, LoadedProduct, PersistedProductState};
use crate::reverse::resolve_requirements;
use crate::suggest::{suggest, SuggestionReport};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FfiResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> FfiResult<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl FfiResult<()> {
    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// A loaded product together with suggestions for its canvas.
#[derive(Debug, Serialize)]
pub struct LoadedProductView {
    #[serde(flatten)]
    pub product: LoadedProduct,
    pub suggestions: SuggestionReport,
}

/// Run `compute` and wrap its outcome in the envelope. Panics inside `compute` become an
/// error envelope instead of unwinding across the binding boundary.
pub fn envelope<T, F>(compute: F) -> String
where
    T: Serialize,
    F: FnOnce() -> Result<T, String> + std::panic::UnwindSafe,
{
    match std::panic::catch_unwind(compute) {
        Ok(Ok(data)) => serde_json::to_string(&FfiResult::ok(data))
            .unwrap_or_else(|e| error_json(format!("JSON serialization error: {e}"))),
        Ok(Err(message)) => error_json(message),
        Err(_) => error_json("Internal engine panic"),
    }
}

fn error_json(message: impl Into<String>) -> String {
    // a struct of bool and Option<String> always serializes
    serde_json::to_string(&FfiResult::err(message))
        .unwrap_or_else(|_| r#"{"success":false}"#.to_string())
}

/// Parse catalog JSON for the JSON API. A blank catalog is absent input and
/// yields an empty catalog.
pub fn parse_catalog(catalog_json: &str) -> Result<Catalog, String> {
    if catalog_json.trim().is_empty() {
        return Ok(Catalog::default());
    }
    Catalog::from_json(catalog_json).map_err(|e| e.to_string())
}

fn parse_keys(canvas_keys_json: &str) -> Result<Vec<String>, String> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keys {
        List(Vec<String>),
        Null(()),
    }

    if canvas_keys_json.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(canvas_keys_json) {
        Ok(Keys::List(keys)) => Ok(keys),
        Ok(Keys::Null(())) => Ok(Vec::new()),
        Err(e) => Err(format!("Invalid canvas keys JSON: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Public FFI functions
// ---------------------------------------------------------------------------

/// Level-1 and level-2 suggestions for a canvas.
///
/// Input: catalog JSON, JSON array of entity keys on the canvas
/// Output: envelope around a `SuggestionReport`
pub fn suggest_to_json(catalog_json: &str, canvas_keys_json: &str) -> String {
    let catalog = match parse_catalog(catalog_json) {
        Ok(c) => c,
        Err(e) => return error_json(e),
    };
    let keys = match parse_keys(canvas_keys_json) {
        Ok(k) => k,
        Err(e) => return error_json(e),
    };
    envelope(move || Ok(suggest(&keys, &catalog)))
}

/// Entities the selected entity needs that are not on the canvas.
///
/// Input: catalog JSON, selected entity key, JSON array of canvas keys
/// Output: envelope around an array of `ReverseDependency`
pub fn requirements_to_json(catalog_json: &str, selected_key: &str, canvas_keys_json: &str) -> String {
    let catalog = match parse_catalog(catalog_json) {
        Ok(c) => c,
        Err(e) => return error_json(e),
    };
    let keys = match parse_keys(canvas_keys_json) {
        Ok(k) => k,
        Err(e) => return error_json(e),
    };
    let selected = selected_key.to_string();
    envelope(move || Ok(resolve_requirements(&selected, &catalog, &keys)))
}

/// Rebuild a persisted product and suggest against the reloaded canvas.
///
/// Input: catalog JSON, persisted product JSON
/// Output: envelope around `{ canvas, attributes, report, suggestions }`
pub fn load_product_to_json(catalog_json: &str, product_json: &str) -> String {
    let catalog = match parse_catalog(catalog_json) {
        Ok(c) => c,
        Err(e) => return error_json(e),
    };
    let state = match PersistedProductState::from_json(product_json) {
        Ok(s) => s,
        Err(e) => return error_json(e.to_string()),
    };
    envelope(move || {
        let product = load_product(&state);
        let suggestions = suggest(&product.canvas.entity_keys(), &catalog);
        Ok(LoadedProductView {
            product,
            suggestions,
        })
    })
}

/// Rewrite a persisted product in the current format, with stable node ids.
///
/// Input: persisted product JSON (any supported version)
/// Output: envelope around the rewritten `PersistedProductState`
pub fn upgrade_product_to_json(product_json: &str) -> String {
    let state = match PersistedProductState::from_json(product_json) {
        Ok(s) => s,
        Err(e) => return error_json(e.to_string()),
    };
    envelope(move || {
        let loaded = load_product(&state);
        Ok(save_product(&loaded.canvas, &loaded.attributes))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn envelope_reports_errors_and_panics() {
        let v: Value = serde_json::from_str(&envelope(|| Err::<(), _>("boom".into()))).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], "boom");
        assert!(v.get("data").is_none());

        let v: Value = serde_json::from_str(&envelope(|| -> Result<(), String> { panic!("x") })).unwrap();
        assert_eq!(v["error"], "Internal engine panic");
    }

    #[test]
    fn keys_accept_null_and_blank() {
        assert!(parse_keys("null").unwrap().is_empty());
        assert!(parse_keys("  ").unwrap().is_empty());
        assert_eq!(parse_keys(r#"["BASE_A"]"#).unwrap(), vec!["BASE_A"]);
        assert!(parse_keys("{").is_err());
    }
}
