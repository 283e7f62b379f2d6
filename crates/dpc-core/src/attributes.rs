//! Per-field attribute modes, as an immutable configuration value.
//!
//! Every entity on the canvas has a mode (its own, or the global default).
//! Individual fields may be toggled, which flips them to the opposite of
//! their entity's mode. Toggle state is keyed `"{nodeId}_{field}"`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::defaults::TOGGLE_KEY_SEPARATOR;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeMode {
    #[default]
    Runtime,
    Loadtime,
}

impl AttributeMode {
    pub fn opposite(self) -> Self {
        match self {
            AttributeMode::Runtime => AttributeMode::Loadtime,
            AttributeMode::Loadtime => AttributeMode::Runtime,
        }
    }
}

pub fn toggle_key(node_id: &str, field: &str) -> String {
    format!("{node_id}{TOGGLE_KEY_SEPARATOR}{field}")
}

/// Split a toggle key into `(node_id, field)` at the first separator.
/// Node ids never contain the separator; field names may.
pub fn split_toggle_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(TOGGLE_KEY_SEPARATOR)
}

/// Toggle and mode state for one product. All operations return a new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeConfiguration {
    #[serde(rename = "attributeToggles", default)]
    toggles: BTreeMap<String, bool>,
    #[serde(rename = "entityAttributeModes", default)]
    modes: BTreeMap<String, AttributeMode>,
    #[serde(rename = "globalAttributeMode", default)]
    global_mode: AttributeMode,
}

impl AttributeConfiguration {
    pub fn new(global_mode: AttributeMode) -> Self {
        Self {
            global_mode,
            ..Self::default()
        }
    }

    pub fn from_parts(
        toggles: BTreeMap<String, bool>,
        modes: BTreeMap<String, AttributeMode>,
        global_mode: AttributeMode,
    ) -> Self {
        Self {
            toggles,
            modes,
            global_mode,
        }
    }

    pub fn toggles(&self) -> &BTreeMap<String, bool> {
        &self.toggles
    }

    pub fn modes(&self) -> &BTreeMap<String, AttributeMode> {
        &self.modes
    }

    pub fn global_mode(&self) -> AttributeMode {
        self.global_mode
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty() && self.modes.is_empty()
    }

    /// Flip a field's toggle. An absent toggle becomes `true`.
    pub fn toggle_field(&self, node_id: &str, field: &str) -> Self {
        let mut next = self.clone();
        let entry = next.toggles.entry(toggle_key(node_id, field)).or_insert(false);
        *entry = !*entry;
        next
    }

    pub fn set_entity_mode(&self, node_id: &str, mode: AttributeMode) -> Self {
        let mut next = self.clone();
        next.modes.insert(node_id.to_string(), mode);
        next
    }

    pub fn set_global_mode(&self, mode: AttributeMode) -> Self {
        Self {
            global_mode: mode,
            ..self.clone()
        }
    }

    /// The entity's own mode, falling back to the global mode.
    pub fn entity_mode(&self, node_id: &str) -> AttributeMode {
        self.modes.get(node_id).copied().unwrap_or(self.global_mode)
    }

    pub fn is_toggled(&self, node_id: &str, field: &str) -> bool {
        self.toggles
            .get(&toggle_key(node_id, field))
            .copied()
            .unwrap_or(false)
    }

    pub fn effective_mode(&self, node_id: &str, field: &str) -> AttributeMode {
        let mode = self.entity_mode(node_id);
        if self.is_toggled(node_id, field) {
            mode.opposite()
        } else {
            mode
        }
    }

    /// Field names with a toggle entry for `node_id`, whatever its value.
    pub fn toggled_fields(&self, node_id: &str) -> BTreeSet<&str> {
        self.toggles
            .keys()
            .filter_map(|key| split_toggle_key(key))
            .filter(|(id, _)| *id == node_id)
            .map(|(_, field)| field)
            .collect()
    }

    /// Node ids that have at least one toggle entry.
    pub fn toggled_nodes(&self) -> BTreeSet<&str> {
        self.toggles
            .keys()
            .filter_map(|key| split_toggle_key(key))
            .map(|(id, _)| id)
            .collect()
    }

    /// Drop every toggle and mode whose node id is not in `node_ids`.
    pub fn retain_nodes(&self, node_ids: &BTreeSet<&str>) -> Self {
        let toggles = self
            .toggles
            .iter()
            .filter(|(key, _)| split_toggle_key(key).is_some_and(|(id, _)| node_ids.contains(id)))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        let modes = self
            .modes
            .iter()
            .filter(|(id, _)| node_ids.contains(id.as_str()))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        Self::from_parts(toggles, modes, self.global_mode)
    }

    /// Copy the state of `old_id` in `source` onto `new_id` in `self`.
    pub(crate) fn with_node_state_from(
        &self,
        source: &AttributeConfiguration,
        old_id: &str,
        new_id: &str,
    ) -> Self {
        let mut next = self.clone();
        for (key, value) in &source.toggles {
            if let Some((id, field)) = split_toggle_key(key) {
                if id == old_id {
                    next.toggles.insert(toggle_key(new_id, field), *value);
                }
            }
        }
        if let Some(mode) = source.modes.get(old_id) {
            next.modes.insert(new_id.to_string(), *mode);
        }
        next
    }
}
