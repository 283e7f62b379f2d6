use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::defaults::{BASE_PREFIX, CTE_PREFIX, VIEW_PREFIX};

// ---------------------------------------------------------------------------
// Entity classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    #[default]
    Base,
    Cte,
    View,
}

impl EntityType {
    pub fn prefix(self) -> &'static str {
        match self {
            EntityType::Base => BASE_PREFIX,
            EntityType::Cte => CTE_PREFIX,
            EntityType::View => VIEW_PREFIX,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Base => "BASE",
            EntityType::Cte => "CTE",
            EntityType::View => "VIEW",
        }
    }

    /// Infer the type from a `"{TYPE}_{Name}"` key. Keys without a known
    /// prefix are treated as BASE.
    pub fn from_key(key: &str) -> Self {
        [EntityType::Cte, EntityType::View, EntityType::Base]
            .into_iter()
            .find(|t| key.starts_with(t.prefix()))
            .unwrap_or_default()
    }

    /// CTEs and VIEWs are derived from other entities; only they are
    /// ever suggested.
    pub fn is_derived(self) -> bool {
        !matches!(self, EntityType::Base)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip the type prefix from an entity key (`"BASE_Customers"` → `"Customers"`).
pub fn display_name(key: &str) -> &str {
    [BASE_PREFIX, CTE_PREFIX, VIEW_PREFIX]
        .iter()
        .find_map(|p| key.strip_prefix(p))
        .unwrap_or(key)
}

// ---------------------------------------------------------------------------
// Field references
// ---------------------------------------------------------------------------

/// A parsed `"EntityKey.FieldName"` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub entity: String,
    pub field: String,
}

impl FieldRef {
    /// Split on the first `.`. Returns `None` when there is no separator.
    pub fn parse(raw: &str) -> Option<Self> {
        let (entity, field) = raw.split_once('.')?;
        Some(Self {
            entity: entity.to_string(),
            field: field.to_string(),
        })
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Ref,
    Calculation,
}

// ---------------------------------------------------------------------------
// Catalog definitions (deserialized from catalog JSON)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<String>>,
    pub expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<Calculation>,
    /// Catalog attributes this engine does not interpret (type, description, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One raw reference string of a field, with the connection it implies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReference<'a> {
    pub raw: &'a str,
    pub connection_type: ConnectionType,
    pub expression: Option<&'a str>,
}

impl FieldDef {
    /// Direct refs first, then calculation refs.
    pub fn references(&self) -> impl Iterator<Item = RawReference<'_>> {
        let direct = self.refs.iter().flatten().map(|raw| RawReference {
            raw: raw.as_str(),
            connection_type: ConnectionType::Ref,
            expression: None,
        });
        let calculated = self.calculation.iter().flat_map(|calc| {
            calc.refs.iter().flatten().map(move |raw| RawReference {
                raw: raw.as_str(),
                connection_type: ConnectionType::Calculation,
                expression: Some(calc.expression.as_str()),
            })
        });
        direct.chain(calculated)
    }

    pub fn has_references(&self) -> bool {
        self.references().next().is_some()
    }

    /// Primary-key flag, read from the catalog's `isPK` or `pk` attribute.
    pub fn is_primary_key(&self) -> bool {
        ["isPK", "pk"]
            .iter()
            .any(|k| self.extra.get(*k).and_then(serde_json::Value::as_bool) == Some(true))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDef>,
}

impl EntityDef {
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Dependency maps
// ---------------------------------------------------------------------------

/// One field-level connection backing a suggestion or requirement.
/// `source_field` and `target_field` are full `"Entity.Field"` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLink {
    #[serde(rename = "sourceField")]
    pub source_field: String,
    #[serde(rename = "targetField")]
    pub target_field: String,
    #[serde(rename = "connectionType")]
    pub connection_type: ConnectionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation: Option<String>,
}

impl DependencyLink {
    pub fn source(&self) -> Option<FieldRef> {
        FieldRef::parse(&self.source_field)
    }

    pub fn target(&self) -> Option<FieldRef> {
        FieldRef::parse(&self.target_field)
    }
}

/// Referenced entity key → the links that reference it.
pub type DependencyMap = BTreeMap<String, Vec<DependencyLink>>;

/// Key, display name and inferred type of a referenced entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl EntitySummary {
    pub fn from_key(key: &str) -> Self {
        Self {
            key: key.to_string(),
            name: display_name(key).to_string(),
            entity_type: EntityType::from_key(key),
        }
    }
}

// ---------------------------------------------------------------------------
// Suggestions and requirements (serialized to JSON output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SuggestionLevel {
    /// Buildable from canvas entities alone.
    Direct,
    /// Builds on at least one level-1 suggestion.
    Transitive,
}

impl From<SuggestionLevel> for u8 {
    fn from(level: SuggestionLevel) -> u8 {
        match level {
            SuggestionLevel::Direct => 1,
            SuggestionLevel::Transitive => 2,
        }
    }
}

impl TryFrom<u8> for SuggestionLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SuggestionLevel::Direct),
            2 => Ok(SuggestionLevel::Transitive),
            other => Err(format!("invalid suggestion level {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "entityKey")]
    pub entity_key: String,
    pub name: String,
    #[serde(rename = "entityType")]
    pub entity_type: EntityType,
    pub level: SuggestionLevel,
    #[serde(rename = "coveragePercent")]
    pub coverage_percent: u8,
    #[serde(rename = "matchingEntities")]
    pub matching_entities: Vec<EntitySummary>,
    #[serde(rename = "missingEntities")]
    pub missing_entities: Vec<EntitySummary>,
    #[serde(rename = "dependencyMap")]
    pub dependency_map: DependencyMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseDependency {
    #[serde(rename = "entityKey")]
    pub entity_key: String,
    pub name: String,
    #[serde(rename = "entityType")]
    pub entity_type: EntityType,
    /// Whether the catalog defines this entity, i.e. whether it can be added.
    #[serde(rename = "inCatalog")]
    pub in_catalog: bool,
    #[serde(rename = "dependencyMap")]
    pub dependency_map: DependencyMap,
}
