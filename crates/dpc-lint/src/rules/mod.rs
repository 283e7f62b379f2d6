//! Built-in lint rules.

pub mod base_with_references;
pub mod dangling_reference;
pub mod dependency_cycle;
pub mod entity_key_format;
pub mod malformed_reference;
pub mod shared_field_signature;

pub use base_with_references::BaseWithReferencesRule;
pub use dangling_reference::DanglingReferenceRule;
pub use dependency_cycle::DependencyCycleRule;
pub use entity_key_format::EntityKeyFormatRule;
pub use malformed_reference::MalformedReferenceRule;
pub use shared_field_signature::SharedFieldSignatureRule;
