pub mod attributes;
pub mod canvas;
pub mod catalog;
pub mod defaults;
pub mod error;
pub mod ffi;
pub mod product;
pub mod reconcile;
pub mod reference;
pub mod reverse;
pub mod suggest;
pub mod types;

pub use attributes::{AttributeConfiguration, AttributeMode};
pub use canvas::{CanvasGraph, CanvasNode, Connection, Materialized, Position};
pub use catalog::Catalog;
pub use error::{CanvasError, CatalogError, ProductError};
pub use ffi::{
    load_product_to_json, requirements_to_json, suggest_to_json, upgrade_product_to_json,
};
pub use product::{load_product, save_product, LoadedProduct, PersistedProductState};
pub use reconcile::{reconcile, EntitySignature, Reconciliation};
pub use reference::{resolve_entity, resolve_field};
pub use reverse::resolve_requirements;
pub use suggest::{compute_level1, compute_level2, suggest, SuggestionReport, SuggestionStatus};
pub use types::*;
