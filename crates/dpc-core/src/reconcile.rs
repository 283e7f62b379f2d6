//! Best-effort migration of attribute state keyed by regenerated node ids.
//!
//! Product files written before stable node ids existed key their toggles
//! and modes by the `node-N` ids of the session that saved them. Those ids
//! are reassigned on every load, so the saved state has to be re-anchored by
//! signature: the set of field names each old id has toggles for.
//!
//! Matching is conservative. A loaded entity only inherits an old id's state
//! when every one of its fields appears in that id's toggle record. Any
//! added or removed field resets the entity to defaults rather than risk
//! attaching state to the wrong entity.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attributes::AttributeConfiguration;
use crate::defaults::NODE_ID_PREFIX;
use crate::types::EntityDef;

/// Sequential `node-N` id source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeIdAllocator {
    next: u64,
}

impl NodeIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start after the highest `node-N` among `existing`.
    pub fn after<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        let next = existing
            .into_iter()
            .filter_map(node_index)
            .filter_map(|n| n.checked_add(1))
            .max()
            .unwrap_or(0);
        Self { next }
    }

    pub fn peek(&self) -> String {
        format!("{NODE_ID_PREFIX}{}", self.next)
    }

    pub fn next_id(&mut self) -> String {
        let id = self.peek();
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Numeric part of a `node-N` id. Indices beyond `u32` are treated as
/// custom ids so the allocator never runs out of successors.
pub fn node_index(id: &str) -> Option<u64> {
    id.strip_prefix(NODE_ID_PREFIX)?
        .parse::<u32>()
        .ok()
        .map(u64::from)
}

/// Ordering for old ids: `node-2` before `node-10`, other ids after, by text.
fn id_order(id: &str) -> (u64, &str) {
    (node_index(id).unwrap_or(u64::MAX), id)
}

/// An entity being loaded, identified by its exact field-name set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySignature {
    pub key: String,
    pub fields: BTreeSet<String>,
}

impl EntitySignature {
    pub fn of(key: &str, entity: &EntityDef) -> Self {
        Self {
            key: key.to_string(),
            fields: entity.field_names().map(str::to_string).collect(),
        }
    }
}

/// The new id given to a loaded entity and the old id it inherited from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAssignment {
    #[serde(rename = "entityKey")]
    pub entity_key: String,
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "inheritedFrom", skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Saved state re-keyed under the new ids. Global mode is carried over.
    pub configuration: AttributeConfiguration,
    /// One per loaded entity, in load order.
    pub assignments: Vec<NodeAssignment>,
    /// Old ids whose saved state matched no loaded entity.
    pub dropped: Vec<String>,
}

impl Reconciliation {
    pub fn node_ids(&self) -> BTreeMap<String, String> {
        self.assignments
            .iter()
            .map(|a| (a.entity_key.clone(), a.node_id.clone()))
            .collect()
    }
}

/// Re-key `saved` onto fresh sequential ids for `entities`, in load order.
///
/// Each entity is matched greedily, in load order, against the first unclaimed
/// old id (in id order) whose toggled-field set contains all of its fields.
/// Each old id is claimed at most once. Entities without fields never match.
pub fn reconcile(saved: &AttributeConfiguration, entities: &[EntitySignature]) -> Reconciliation {
    let mut records: Vec<(&str, BTreeSet<&str>)> = saved
        .toggled_nodes()
        .into_iter()
        .map(|id| (id, saved.toggled_fields(id)))
        .collect();
    records.sort_by(|a, b| id_order(a.0).cmp(&id_order(b.0)));

    let mut claimed: BTreeSet<&str> = BTreeSet::new();
    let mut allocator = NodeIdAllocator::new();
    let mut configuration = AttributeConfiguration::new(saved.global_mode());
    let mut assignments = Vec::with_capacity(entities.len());

    for signature in entities {
        let node_id = allocator.next_id();
        let matched = best_match(signature, &records, &claimed);

        if let Some(old_id) = matched {
            claimed.insert(old_id);
            configuration = configuration.with_node_state_from(saved, old_id, &node_id);
            debug!(entity = %signature.key, old_id, new_id = %node_id, "attribute state carried over");
        }

        assignments.push(NodeAssignment {
            entity_key: signature.key.clone(),
            node_id,
            inherited_from: matched.map(str::to_string),
        });
    }

    let dropped: Vec<String> = records
        .iter()
        .map(|(id, _)| *id)
        .chain(saved.modes().keys().map(String::as_str))
        .filter(|id| !claimed.contains(*id))
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !dropped.is_empty() {
        debug!(count = dropped.len(), "saved attribute state matched no entity");
    }

    Reconciliation {
        configuration,
        assignments,
        dropped,
    }
}

fn best_match<'a>(
    signature: &EntitySignature,
    records: &[(&'a str, BTreeSet<&'a str>)],
    claimed: &BTreeSet<&str>,
) -> Option<&'a str> {
    if signature.fields.is_empty() {
        return None;
    }
    records
        .iter()
        .find(|(id, toggled)| {
            !claimed.contains(*id)
                && signature
                    .fields
                    .iter()
                    .all(|f| toggled.contains(f.as_str()))
        })
        .map(|(id, _)| *id)
}
