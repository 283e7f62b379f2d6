//! Canvas graph: entity nodes and field-level connections.
//!
//! Rendering and layout belong to the caller. This module only guarantees
//! that a node and all of its dependency edges enter the graph together:
//! every edge is computed before anything is committed, and an edge whose
//! other endpoint is not on the canvas is reported back instead of added.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attributes::{AttributeConfiguration, AttributeMode};
use crate::catalog::Catalog;
use crate::defaults::{EDGE_ID_PREFIX, NODE_SPACING_X};
use crate::error::{CanvasError, CanvasResult};
use crate::reconcile::NodeIdAllocator;
use crate::types::{
    ConnectionType, DependencyLink, DependencyMap, EntityDef, EntityType, FieldRef,
    ReverseDependency, Suggestion,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Default placement for the `index`-th node when the caller gives none.
    pub(crate) fn slot(index: usize) -> Self {
        Self::new(index as f64 * NODE_SPACING_X, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasField {
    pub name: String,
    #[serde(rename = "isPK")]
    pub is_pk: bool,
    #[serde(rename = "attributeMode")]
    pub attribute_mode: AttributeMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasNode {
    pub id: String,
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(rename = "tableType")]
    pub table_type: EntityType,
    pub fields: Vec<CanvasField>,
    pub position: Position,
}

impl CanvasNode {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEndpoint {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "fieldName")]
    pub field_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub source: FieldEndpoint,
    pub target: FieldEndpoint,
    #[serde(rename = "connectionType")]
    pub connection_type: ConnectionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation: Option<String>,
}

impl Connection {
    fn same_wiring(&self, other: &Connection) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.connection_type == other.connection_type
    }

    fn touches(&self, node_id: &str) -> bool {
        self.source.node_id == node_id || self.target.node_id == node_id
    }
}

/// Outcome of adding an entity with its dependency edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Materialized {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "connectionIds")]
    pub connection_ids: Vec<String>,
    /// Links whose other endpoint is not on the canvas yet.
    pub deferred: Vec<DependencyLink>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CanvasGraph {
    nodes: Vec<CanvasNode>,
    connections: Vec<Connection>,
    #[serde(skip)]
    definitions: BTreeMap<String, EntityDef>,
    #[serde(skip)]
    node_ids: NodeIdAllocator,
    #[serde(skip)]
    next_edge: usize,
}

impl CanvasGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[CanvasNode] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&CanvasNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_for(&self, entity_key: &str) -> Option<&CanvasNode> {
        self.nodes.iter().find(|n| n.table_name == entity_key)
    }

    /// Entity keys on the canvas, in insertion order.
    pub fn entity_keys(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.table_name.clone()).collect()
    }

    pub fn definition(&self, entity_key: &str) -> Option<&EntityDef> {
        self.definitions.get(entity_key)
    }

    pub(crate) fn definitions(&self) -> &BTreeMap<String, EntityDef> {
        &self.definitions
    }

    /// Add an entity without edges.
    pub fn add_entity(
        &mut self,
        entity_key: &str,
        entity: &EntityDef,
        position: Option<Position>,
    ) -> CanvasResult<String> {
        self.materialize(entity_key, entity, &DependencyMap::new(), position)
            .map(|m| m.node_id)
    }

    /// Add an entity together with every edge of `dependency_map` that can be
    /// wired now.
    ///
    /// A link is wired when one endpoint is the new entity and the other is
    /// the new entity or already on the canvas. All other links come back in
    /// [`Materialized::deferred`]. Nothing is modified on error.
    pub fn materialize(
        &mut self,
        entity_key: &str,
        entity: &EntityDef,
        dependency_map: &DependencyMap,
        position: Option<Position>,
    ) -> CanvasResult<Materialized> {
        if self.node_for(entity_key).is_some() {
            return Err(CanvasError::AlreadyOnCanvas(entity_key.to_string()));
        }

        let node_id = self.node_ids.peek();
        let mut pending: Vec<Connection> = Vec::new();
        let mut deferred: Vec<DependencyLink> = Vec::new();

        for link in dependency_map.values().flatten() {
            let wired = self.wire(link, entity_key, entity, &node_id);
            match wired {
                Some(conn) if !pending.iter().any(|p| p.same_wiring(&conn)) => pending.push(conn),
                Some(_) => {}
                None => deferred.push(link.clone()),
            }
        }

        // commit: node first, then its edges
        let node_id = self.node_ids.next_id();
        let position = position.unwrap_or_else(|| Position::slot(self.nodes.len()));
        self.insert_node(node_id.clone(), entity_key, entity, position);

        let mut connection_ids = Vec::with_capacity(pending.len());
        for mut conn in pending {
            conn.id = self.next_edge_id();
            connection_ids.push(conn.id.clone());
            self.connections.push(conn);
        }

        debug!(
            entity = entity_key,
            node = %node_id,
            edges = connection_ids.len(),
            deferred = deferred.len(),
            "entity materialized"
        );

        Ok(Materialized {
            node_id,
            connection_ids,
            deferred,
        })
    }

    pub fn materialize_suggestion(
        &mut self,
        suggestion: &Suggestion,
        catalog: &Catalog,
        position: Option<Position>,
    ) -> CanvasResult<Materialized> {
        let entity = catalog
            .get(&suggestion.entity_key)
            .ok_or_else(|| CanvasError::UnknownEntity(suggestion.entity_key.clone()))?;
        self.materialize(
            &suggestion.entity_key,
            entity,
            &suggestion.dependency_map,
            position,
        )
    }

    pub fn materialize_requirement(
        &mut self,
        requirement: &ReverseDependency,
        catalog: &Catalog,
        position: Option<Position>,
    ) -> CanvasResult<Materialized> {
        let entity = catalog
            .get(&requirement.entity_key)
            .ok_or_else(|| CanvasError::UnknownEntity(requirement.entity_key.clone()))?;
        self.materialize(
            &requirement.entity_key,
            entity,
            &requirement.dependency_map,
            position,
        )
    }

    /// Remove a node and every connection touching it.
    pub fn remove_node(&mut self, node_id: &str) -> CanvasResult<CanvasNode> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| CanvasError::UnknownNode(node_id.to_string()))?;
        let node = self.nodes.remove(index);
        self.connections.retain(|c| !c.touches(node_id));
        self.definitions.remove(&node.table_name);
        Ok(node)
    }

    /// Set every field's displayed mode from `config`.
    pub fn apply_attributes(&mut self, config: &AttributeConfiguration) {
        for node in &mut self.nodes {
            for field in &mut node.fields {
                field.attribute_mode = config.effective_mode(&node.id, &field.name);
            }
        }
    }

    pub(crate) fn insert_node(
        &mut self,
        node_id: String,
        entity_key: &str,
        entity: &EntityDef,
        position: Position,
    ) {
        let fields = entity
            .fields
            .iter()
            .map(|(name, def)| CanvasField {
                name: name.clone(),
                is_pk: def.is_primary_key(),
                attribute_mode: AttributeMode::default(),
            })
            .collect();
        self.nodes.push(CanvasNode {
            id: node_id,
            table_name: entity_key.to_string(),
            table_type: EntityType::from_key(entity_key),
            fields,
            position,
        });
        self.definitions
            .insert(entity_key.to_string(), entity.clone());
    }

    /// Continue sequential ids after every node currently on the canvas.
    pub(crate) fn resync_node_ids(&mut self) {
        self.node_ids = NodeIdAllocator::after(self.nodes.iter().map(|n| n.id.as_str()));
    }

    /// Add a connection between existing nodes unless an identical one exists.
    pub(crate) fn connect(
        &mut self,
        source: FieldEndpoint,
        target: FieldEndpoint,
        connection_type: ConnectionType,
        calculation: Option<String>,
    ) -> Option<String> {
        let mut conn = Connection {
            id: String::new(),
            source,
            target,
            connection_type,
            calculation,
        };
        if self.connections.iter().any(|c| c.same_wiring(&conn)) {
            return None;
        }
        conn.id = self.next_edge_id();
        let id = conn.id.clone();
        self.connections.push(conn);
        Some(id)
    }

    fn next_edge_id(&mut self) -> String {
        let id = format!("{EDGE_ID_PREFIX}{}", self.next_edge);
        self.next_edge += 1;
        id
    }

    /// Resolve a link into a connection for a node about to be added, or
    /// `None` if it cannot be wired yet.
    fn wire(
        &self,
        link: &DependencyLink,
        new_key: &str,
        new_entity: &EntityDef,
        new_id: &str,
    ) -> Option<Connection> {
        let source = link.source()?;
        let target = link.target()?;
        if source.entity != new_key && target.entity != new_key {
            return None;
        }
        Some(Connection {
            id: String::new(),
            source: self.endpoint(&source, new_key, new_entity, new_id)?,
            target: self.endpoint(&target, new_key, new_entity, new_id)?,
            connection_type: link.connection_type,
            calculation: link.calculation.clone(),
        })
    }

    fn endpoint(
        &self,
        reference: &FieldRef,
        new_key: &str,
        new_entity: &EntityDef,
        new_id: &str,
    ) -> Option<FieldEndpoint> {
        let node_id = if reference.entity == new_key {
            if !new_entity.fields.contains_key(&reference.field) {
                return None;
            }
            new_id.to_string()
        } else {
            let node = self.node_for(&reference.entity)?;
            if !node.has_field(&reference.field) {
                return None;
            }
            node.id.clone()
        };
        Some(FieldEndpoint {
            node_id,
            field_name: reference.field.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reverse::resolve_requirements;
    use crate::suggest::compute_level1;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"{"entities": {
                "BASE_Customers": {"fields": {"id": {"isPK": true}, "email": {}}},
                "BASE_Products": {"fields": {"sku": {"isPK": true}, "price": {}}},
                "CTE_Orders": {"fields": {
                    "customer_id": {"ref": ["BASE_Customers.id"]},
                    "sku": {"ref": ["BASE_Products.sku"]},
                    "total": {"calculation": {"ref": ["BASE_Products.price"], "expression": "SUM(price)"}}
                }}
            }}"#,
        )
        .unwrap()
    }

    fn add(canvas: &mut CanvasGraph, catalog: &Catalog, key: &str) -> String {
        canvas
            .add_entity(key, catalog.get(key).unwrap(), None)
            .unwrap()
    }

    #[test]
    fn add_entity_builds_fields() {
        let catalog = catalog();
        let mut canvas = CanvasGraph::new();
        let id = add(&mut canvas, &catalog, "BASE_Customers");
        assert_eq!(id, "node-0");
        let node = canvas.node(&id).unwrap();
        assert_eq!(node.table_type, EntityType::Base);
        assert_eq!(node.fields.len(), 2);
        let pk: Vec<&str> = node.fields.iter().filter(|f| f.is_pk).map(|f| f.name.as_str()).collect();
        assert_eq!(pk, vec!["id"]);
    }

    #[test]
    fn suggestion_wires_present_entities_and_defers_rest() {
        let catalog = catalog();
        let mut canvas = CanvasGraph::new();
        let customers = add(&mut canvas, &catalog, "BASE_Customers");

        let suggestions = compute_level1(&canvas.entity_keys(), &catalog);
        let result = canvas
            .materialize_suggestion(&suggestions[0], &catalog, None)
            .unwrap();

        assert_eq!(result.node_id, "node-1");
        assert_eq!(result.connection_ids.len(), 1);
        assert_eq!(result.deferred.len(), 2);
        let conn = &canvas.connections()[0];
        assert_eq!(conn.source.node_id, customers);
        assert_eq!(conn.source.field_name, "id");
        assert_eq!(conn.target.node_id, "node-1");
        assert_eq!(conn.target.field_name, "customer_id");
    }

    #[test]
    fn requirement_wires_into_selected_entity() {
        let catalog = catalog();
        let mut canvas = CanvasGraph::new();
        let orders = add(&mut canvas, &catalog, "CTE_Orders");

        let requirements = resolve_requirements("CTE_Orders", &catalog, &canvas.entity_keys());
        let products = requirements
            .iter()
            .find(|r| r.entity_key == "BASE_Products")
            .unwrap();
        let result = canvas
            .materialize_requirement(products, &catalog, None)
            .unwrap();

        assert_eq!(result.connection_ids.len(), 2);
        assert!(result.deferred.is_empty());
        let calc = canvas
            .connections()
            .iter()
            .find(|c| c.connection_type == ConnectionType::Calculation)
            .unwrap();
        assert_eq!(calc.target.node_id, orders);
        assert_eq!(calc.calculation.as_deref(), Some("SUM(price)"));
    }

    #[test]
    fn duplicate_entity_is_rejected_without_changes() {
        let catalog = catalog();
        let mut canvas = CanvasGraph::new();
        add(&mut canvas, &catalog, "BASE_Customers");
        let err = canvas
            .add_entity("BASE_Customers", catalog.get("BASE_Customers").unwrap(), None)
            .unwrap_err();
        assert_eq!(err, CanvasError::AlreadyOnCanvas("BASE_Customers".into()));
        assert_eq!(canvas.len(), 1);
        // the failed attempt did not consume an id
        assert_eq!(add(&mut canvas, &catalog, "BASE_Products"), "node-1");
    }

    #[test]
    fn unknown_suggestion_entity_is_rejected() {
        let catalog = catalog();
        let mut canvas = CanvasGraph::new();
        let mut suggestion = compute_level1(&["BASE_Customers".to_string()], &catalog)[0].clone();
        suggestion.entity_key = "CTE_Gone".into();
        let err = canvas
            .materialize_suggestion(&suggestion, &catalog, None)
            .unwrap_err();
        assert_eq!(err, CanvasError::UnknownEntity("CTE_Gone".into()));
        assert!(canvas.is_empty());
    }

    #[test]
    fn links_to_unknown_fields_are_deferred() {
        let catalog = catalog();
        let mut canvas = CanvasGraph::new();
        add(&mut canvas, &catalog, "BASE_Customers");
        let map = DependencyMap::from([(
            "BASE_Customers".to_string(),
            vec![DependencyLink {
                source_field: "BASE_Customers.phone".into(),
                target_field: "CTE_Orders.customer_id".into(),
                connection_type: ConnectionType::Ref,
                calculation: None,
            }],
        )]);
        let result = canvas
            .materialize("CTE_Orders", catalog.get("CTE_Orders").unwrap(), &map, None)
            .unwrap();
        assert!(result.connection_ids.is_empty());
        assert_eq!(result.deferred.len(), 1);
    }

    #[test]
    fn remove_node_drops_its_connections() {
        let catalog = catalog();
        let mut canvas = CanvasGraph::new();
        let customers = add(&mut canvas, &catalog, "BASE_Customers");
        let suggestions = compute_level1(&canvas.entity_keys(), &catalog);
        canvas
            .materialize_suggestion(&suggestions[0], &catalog, None)
            .unwrap();
        assert_eq!(canvas.connections().len(), 1);

        let removed = canvas.remove_node(&customers).unwrap();
        assert_eq!(removed.table_name, "BASE_Customers");
        assert!(canvas.connections().is_empty());
        assert!(canvas.definition("BASE_Customers").is_none());
        assert_eq!(
            canvas.remove_node("node-9").unwrap_err(),
            CanvasError::UnknownNode("node-9".into())
        );
    }

    #[test]
    fn apply_attributes_sets_field_modes() {
        let catalog = catalog();
        let mut canvas = CanvasGraph::new();
        let id = add(&mut canvas, &catalog, "BASE_Customers");
        let config = AttributeConfiguration::default()
            .set_entity_mode(&id, AttributeMode::Loadtime)
            .toggle_field(&id, "email");
        canvas.apply_attributes(&config);
        let node = canvas.node(&id).unwrap();
        let modes: Vec<(&str, AttributeMode)> = node
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.attribute_mode))
            .collect();
        assert_eq!(
            modes,
            vec![("email", AttributeMode::Runtime), ("id", AttributeMode::Loadtime)]
        );
    }

    #[test]
    fn explicit_position_is_kept() {
        let catalog = catalog();
        let mut canvas = CanvasGraph::new();
        let id = canvas
            .add_entity(
                "BASE_Customers",
                catalog.get("BASE_Customers").unwrap(),
                Some(Position::new(40.0, 80.0)),
            )
            .unwrap();
        assert_eq!(canvas.node(&id).unwrap().position, Position::new(40.0, 80.0));
        let next = add(&mut canvas, &catalog, "BASE_Products");
        assert_eq!(canvas.node(&next).unwrap().position, Position::slot(1));
    }
}
