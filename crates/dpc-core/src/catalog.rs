//! The entity catalog: every BASE/CTE/VIEW definition a product can use.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::types::{EntityDef, EntityType};

/// Entities keyed by `"{TYPE}_{Name}"`.
///
/// Iteration is in key order. Every ordering decision downstream (suggestion
/// ties, sequential node ids) relies on this being a total, reproducible order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub entities: BTreeMap<String, EntityDef>,
}

impl Catalog {
    pub fn new(entities: BTreeMap<String, EntityDef>) -> Self {
        Self { entities }
    }

    /// Parse catalog JSON. This is the one place where a bad document fails
    /// loudly; everything after it degrades silently.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(CatalogError::Parse)?;
        if !value.get("entities").is_some_and(serde_json::Value::is_object) {
            return Err(CatalogError::MissingEntities);
        }
        let catalog: Catalog = serde_json::from_value(value).map_err(CatalogError::Parse)?;
        debug!(entities = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn get(&self, key: &str) -> Option<&EntityDef> {
        self.entities.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entities.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntityDef)> {
        self.entities.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// CTE and VIEW entities, the only kinds that are ever suggested.
    pub fn derived(&self) -> impl Iterator<Item = (&str, &EntityDef)> {
        self.iter()
            .filter(|(key, _)| EntityType::from_key(key).is_derived())
    }

    /// Whether `entity.field` names a field the catalog defines.
    pub fn has_field(&self, entity: &str, field: &str) -> bool {
        self.get(entity)
            .is_some_and(|def| def.fields.contains_key(field))
    }
}

impl FromIterator<(String, EntityDef)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (String, EntityDef)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
