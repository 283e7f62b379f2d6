use dpc_core::{
    load_product_to_json, requirements_to_json, suggest_to_json, upgrade_product_to_json,
};
use serde_json::Value;

const CATALOG: &str = include_str!("../../../fixtures/orders.catalog.json");
const PRODUCT: &str = include_str!("../../../fixtures/product.json");
const LEGACY_PRODUCT: &str = include_str!("../../../fixtures/legacy-product.json");

fn assert_success(json: &str) -> Value {
    let v: Value = serde_json::from_str(json).expect("valid JSON");
    assert_eq!(v["success"], true, "expected success=true, got: {json}");
    v
}

fn assert_failure(json: &str) -> Value {
    let v: Value = serde_json::from_str(json).expect("valid JSON");
    assert_eq!(v["success"], false, "expected success=false, got: {json}");
    v
}

fn keys(v: &Value) -> Vec<&str> {
    v.as_array()
        .unwrap()
        .iter()
        .map(|s| s["entityKey"].as_str().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// suggest_to_json
// ---------------------------------------------------------------------------

#[test]
fn ffi_suggest_levels() {
    let result = suggest_to_json(CATALOG, r#"["BASE_Customers"]"#);
    let v = assert_success(&result);
    let data = &v["data"];

    assert_eq!(data["status"], "ready");
    assert_eq!(keys(&data["level1"]), vec!["CTE_Orders", "VIEW_RegionSales"]);
    assert_eq!(data["level1"][0]["coveragePercent"], 50);
    assert_eq!(data["level1"][0]["level"], 1);
    assert_eq!(data["level1"][0]["missingEntities"][0]["name"], "Products");
    assert_eq!(data["level1"][0]["missingEntities"][0]["type"], "BASE");

    assert_eq!(keys(&data["level2"]), vec!["VIEW_OrderSummary"]);
    assert_eq!(data["level2"][0]["level"], 2);
    assert_eq!(data["level2"][0]["coveragePercent"], 100);
}

#[test]
fn ffi_suggest_dependency_map_shape() {
    let result = suggest_to_json(CATALOG, r#"["BASE_Customers", "BASE_Products"]"#);
    let v = assert_success(&result);
    let orders = &v["data"]["level1"][0];
    assert_eq!(orders["entityKey"], "CTE_Orders");

    let products = orders["dependencyMap"]["BASE_Products"].as_array().unwrap();
    assert_eq!(products.len(), 2);
    let calc = products
        .iter()
        .find(|l| l["connectionType"] == "calculation")
        .unwrap();
    assert_eq!(calc["sourceField"], "BASE_Products.price");
    assert_eq!(calc["targetField"], "CTE_Orders.total");
    assert_eq!(calc["calculation"], "SUM(price)");
}

#[test]
fn ffi_suggest_empty_inputs() {
    let v = assert_success(&suggest_to_json(CATALOG, "[]"));
    assert_eq!(v["data"]["status"], "noCanvas");
    let v = assert_success(&suggest_to_json("", r#"["BASE_Customers"]"#));
    assert_eq!(v["data"]["status"], "noCatalog");
}

#[test]
fn ffi_suggest_invalid_input() {
    let v = assert_failure(&suggest_to_json("{not json", "[]"));
    assert!(v["error"].as_str().unwrap().contains("invalid catalog JSON"));

    let v = assert_failure(&suggest_to_json(r#"{"models": {}}"#, "[]"));
    assert!(v["error"].as_str().unwrap().contains("entities"));

    let v = assert_failure(&suggest_to_json(CATALOG, r#"{"a": 1}"#));
    assert!(v["error"].as_str().unwrap().contains("canvas keys"));
}

// ---------------------------------------------------------------------------
// requirements_to_json
// ---------------------------------------------------------------------------

#[test]
fn ffi_requirements() {
    let result = requirements_to_json(CATALOG, "CTE_Orders", r#"["CTE_Orders", "BASE_Customers"]"#);
    let v = assert_success(&result);
    let reqs = v["data"].as_array().unwrap();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0]["entityKey"], "BASE_Products");
    assert_eq!(reqs[0]["entityType"], "BASE");
    assert_eq!(reqs[0]["inCatalog"], true);
    assert_eq!(
        reqs[0]["dependencyMap"]["BASE_Products"].as_array().unwrap().len(),
        2
    );
}

#[test]
fn ffi_requirements_unknown_entity() {
    let v = assert_success(&requirements_to_json(CATALOG, "VIEW_Nope", "[]"));
    assert_eq!(v["data"].as_array().unwrap().len(), 0);
}

// ---------------------------------------------------------------------------
// load_product_to_json
// ---------------------------------------------------------------------------

#[test]
fn ffi_load_stable_product() {
    let v = assert_success(&load_product_to_json(CATALOG, PRODUCT));
    let data = &v["data"];

    assert_eq!(data["report"]["migrated"], false);
    let nodes = data["canvas"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["id"], "node-3");
    assert_eq!(nodes[0]["tableName"], "BASE_Customers");
    assert_eq!(nodes[1]["id"], "node-5");
    assert_eq!(data["canvas"]["connections"].as_array().unwrap().len(), 1);

    let email = nodes[0]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "email")
        .unwrap();
    assert_eq!(email["attributeMode"], "loadtime");

    assert_eq!(
        keys(&data["suggestions"]["level1"]),
        vec!["VIEW_OrderSummary", "VIEW_RegionSales"]
    );
}

#[test]
fn ffi_load_legacy_product() {
    let v = assert_success(&load_product_to_json(CATALOG, LEGACY_PRODUCT));
    let report = &v["data"]["report"];
    assert_eq!(report["migrated"], true);
    assert_eq!(report["droppedState"], serde_json::json!(["node-9"]));
    assert_eq!(report["assignments"][1]["entityKey"], "CTE_Orders");
    assert_eq!(report["assignments"][1]["inheritedFrom"], "node-2");
    assert_eq!(v["data"]["attributes"]["entityAttributeModes"]["node-1"], "loadtime");
}

#[test]
fn ffi_load_out_of_range_node_id() {
    let product = r#"{"version": 2, "entities": {"BASE_A": {"fields": {"x": {}}}},
        "nodeIds": {"BASE_A": "node-18446744073709551615"}}"#;
    let v = assert_success(&load_product_to_json(CATALOG, product));
    assert_eq!(v["data"]["canvas"]["nodes"][0]["id"], "node-18446744073709551615");
}

#[test]
fn ffi_load_rejects_newer_format() {
    let v = assert_failure(&load_product_to_json(CATALOG, r#"{"version": 3}"#));
    assert!(v["error"].as_str().unwrap().contains("unsupported"));
}

// ---------------------------------------------------------------------------
// upgrade_product_to_json
// ---------------------------------------------------------------------------

#[test]
fn ffi_upgrade_legacy_product() {
    let v = assert_success(&upgrade_product_to_json(LEGACY_PRODUCT));
    let data = &v["data"];
    assert_eq!(data["version"], 2);
    assert_eq!(data["nodeIds"]["BASE_Customers"], "node-0");
    assert_eq!(data["nodeIds"]["CTE_Orders"], "node-1");
    assert_eq!(data["attributeToggles"]["node-1_total"], true);
    assert!(data["attributeToggles"].get("node-9_email").is_none());
    assert_eq!(data["relationships"].as_array().unwrap().len(), 1);
}

#[test]
fn ffi_upgrade_is_stable_for_current_format() {
    let once = assert_success(&upgrade_product_to_json(PRODUCT));
    let twice = assert_success(&upgrade_product_to_json(
        &serde_json::to_string(&once["data"]).unwrap(),
    ));
    assert_eq!(once, twice);
    assert_eq!(once["data"]["nodeIds"]["CTE_Orders"], "node-5");
}
