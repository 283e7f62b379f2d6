//! Persisted data products: saving a canvas and loading it back.
//!
//! Files written by this engine record a stable node id per entity
//! (`nodeIds`), so attribute state reloads verbatim. Older files lack it;
//! their state is migrated with [`crate::reconcile::reconcile`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attributes::AttributeConfiguration;
use crate::canvas::{CanvasGraph, FieldEndpoint, Position};
use crate::defaults::PRODUCT_FORMAT_VERSION;
use crate::error::{ProductError, ProductResult};
use crate::reconcile::{reconcile, EntitySignature, NodeAssignment, NodeIdAllocator};
use crate::types::{ConnectionType, EntityDef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEnd {
    pub entity: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: RelationshipEnd,
    pub to: RelationshipEnd,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedProductState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Entities on the canvas, loaded in key order.
    #[serde(default)]
    pub entities: BTreeMap<String, EntityDef>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(flatten)]
    pub attributes: AttributeConfiguration,
    /// Entity key → node id. Absent in files that predate stable ids.
    #[serde(rename = "nodeIds", default, skip_serializing_if = "Option::is_none")]
    pub node_ids: Option<BTreeMap<String, String>>,
}

impl PersistedProductState {
    pub fn from_json(json: &str) -> ProductResult<Self> {
        let state: Self = serde_json::from_str(json).map_err(ProductError::Parse)?;
        match state.version {
            Some(found) if found > PRODUCT_FORMAT_VERSION => Err(ProductError::UnsupportedVersion {
                found,
                supported: PRODUCT_FORMAT_VERSION,
            }),
            _ => Ok(state),
        }
    }

    pub fn to_json_pretty(&self) -> ProductResult<String> {
        serde_json::to_string_pretty(self).map_err(ProductError::Serialize)
    }

    pub fn is_legacy(&self) -> bool {
        self.node_ids.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    /// Whether state was re-anchored by field signature rather than by
    /// stored node ids.
    pub migrated: bool,
    pub assignments: Vec<NodeAssignment>,
    /// Saved node ids whose attribute state was discarded.
    #[serde(rename = "droppedState")]
    pub dropped_state: Vec<String>,
    /// Relationships naming an entity or field that is not on the canvas.
    #[serde(rename = "skippedRelationships")]
    pub skipped_relationships: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedProduct {
    pub canvas: CanvasGraph,
    pub attributes: AttributeConfiguration,
    pub report: LoadReport,
}

/// Rebuild a canvas and its attribute state from a persisted product.
pub fn load_product(state: &PersistedProductState) -> LoadedProduct {
    let (assignments, attributes, dropped_state, migrated) = match &state.node_ids {
        Some(ids) => {
            let (assignments, attributes, dropped) = assign_stable_ids(state, ids);
            (assignments, attributes, dropped, false)
        }
        None => {
            let signatures: Vec<EntitySignature> = state
                .entities
                .iter()
                .map(|(key, def)| EntitySignature::of(key, def))
                .collect();
            let result = reconcile(&state.attributes, &signatures);
            (result.assignments, result.configuration, result.dropped, true)
        }
    };

    let mut canvas = CanvasGraph::new();
    for (index, assignment) in assignments.iter().enumerate() {
        if let Some(def) = state.entities.get(&assignment.entity_key) {
            canvas.insert_node(
                assignment.node_id.clone(),
                &assignment.entity_key,
                def,
                Position::slot(index),
            );
        }
    }
    canvas.resync_node_ids();

    let mut skipped_relationships = 0;
    for rel in &state.relationships {
        match (endpoint(&canvas, &rel.from), endpoint(&canvas, &rel.to)) {
            (Some(source), Some(target)) => {
                canvas.connect(source, target, rel.connection_type, rel.calculation.clone());
            }
            _ => {
                debug!(
                    from = %format!("{}.{}", rel.from.entity, rel.from.field),
                    to = %format!("{}.{}", rel.to.entity, rel.to.field),
                    "skipping relationship with no canvas endpoint"
                );
                skipped_relationships += 1;
            }
        }
    }

    canvas.apply_attributes(&attributes);
    info!(
        entities = canvas.len(),
        connections = canvas.connections().len(),
        migrated,
        dropped = dropped_state.len(),
        "product loaded"
    );

    LoadedProduct {
        canvas,
        attributes,
        report: LoadReport {
            migrated,
            assignments,
            dropped_state,
            skipped_relationships,
        },
    }
}

/// Snapshot a canvas and its attribute state for persistence.
pub fn save_product(canvas: &CanvasGraph, attributes: &AttributeConfiguration) -> PersistedProductState {
    let table_of: BTreeMap<&str, &str> = canvas
        .nodes()
        .iter()
        .map(|n| (n.id.as_str(), n.table_name.as_str()))
        .collect();

    let relationships = canvas
        .connections()
        .iter()
        .filter_map(|c| {
            Some(Relationship {
                from: RelationshipEnd {
                    entity: table_of.get(c.source.node_id.as_str())?.to_string(),
                    field: c.source.field_name.clone(),
                },
                to: RelationshipEnd {
                    entity: table_of.get(c.target.node_id.as_str())?.to_string(),
                    field: c.target.field_name.clone(),
                },
                connection_type: c.connection_type,
                calculation: c.calculation.clone(),
            })
        })
        .collect();

    let live: BTreeSet<&str> = table_of.keys().copied().collect();

    PersistedProductState {
        version: Some(PRODUCT_FORMAT_VERSION),
        entities: canvas.definitions().clone(),
        relationships,
        attributes: attributes.retain_nodes(&live),
        node_ids: Some(
            canvas
                .nodes()
                .iter()
                .map(|n| (n.table_name.clone(), n.id.clone()))
                .collect(),
        ),
    }
}

/// Use stored ids; entities missing from the map, or whose stored id is
/// already taken, get fresh ids after the highest stored one.
fn assign_stable_ids(
    state: &PersistedProductState,
    ids: &BTreeMap<String, String>,
) -> (Vec<NodeAssignment>, AttributeConfiguration, Vec<String>) {
    let mut allocator = NodeIdAllocator::after(ids.values().map(String::as_str));
    let mut used: BTreeSet<String> = BTreeSet::new();
    let mut assignments = Vec::with_capacity(state.entities.len());

    for key in state.entities.keys() {
        let stored = ids.get(key).filter(|id| !used.contains(id.as_str()));
        let node_id = match stored {
            Some(id) => id.clone(),
            None => allocator.next_id(),
        };
        used.insert(node_id.clone());
        assignments.push(NodeAssignment {
            entity_key: key.clone(),
            inherited_from: stored.cloned(),
            node_id,
        });
    }

    let live: BTreeSet<&str> = assignments
        .iter()
        .filter(|a| a.inherited_from.is_some())
        .map(|a| a.node_id.as_str())
        .collect();
    let attributes = state.attributes.retain_nodes(&live);
    let dropped: Vec<String> = state
        .attributes
        .toggled_nodes()
        .into_iter()
        .chain(state.attributes.modes().keys().map(String::as_str))
        .filter(|id| !live.contains(id))
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    (assignments, attributes, dropped)
}

fn endpoint(canvas: &CanvasGraph, end: &RelationshipEnd) -> Option<FieldEndpoint> {
    let node = canvas.node_for(&end.entity)?;
    if !node.has_field(&end.field) {
        return None;
    }
    Some(FieldEndpoint {
        node_id: node.id.clone(),
        field_name: end.field.clone(),
    })
}
