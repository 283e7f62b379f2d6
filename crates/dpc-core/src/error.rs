//! Error types for the few operations that can fail loudly.
//!
//! Resolution itself never fails: absent input, malformed references and
//! unmatched identities all degrade to empty or default results. Only
//! malformed documents and invalid canvas mutations surface here.

use thiserror::Error;

/// Errors raised while reading an entity catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The document is not valid catalog JSON.
    #[error("invalid catalog JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The document parsed but has no `entities` object.
    #[error("catalog has no \"entities\" object")]
    MissingEntities,
}

/// Errors raised while reading or writing a persisted data product.
#[derive(Error, Debug)]
pub enum ProductError {
    #[error("invalid product JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize product: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A persisted format version newer than this engine understands.
    #[error("unsupported product format version {found} (max {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Errors raised by canvas mutations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CanvasError {
    #[error("entity \"{0}\" is already on the canvas")]
    AlreadyOnCanvas(String),

    #[error("entity \"{0}\" is not defined in the catalog")]
    UnknownEntity(String),

    #[error("node \"{0}\" does not exist")]
    UnknownNode(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
pub type ProductResult<T> = Result<T, ProductError>;
pub type CanvasResult<T> = Result<T, CanvasError>;
