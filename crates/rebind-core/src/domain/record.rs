//! Persisted records: the flat representation supplied by the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EntityType, ObjectId};

/// Reference from a record to its owning parent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl ParentRef {
    pub fn new(id: ObjectId, entity_type: EntityType) -> Self {
        Self { id, entity_type }
    }
}

/// One durable record as read back from the store.
///
/// Design:
/// - `id` is stable across restarts and never reassigned.
/// - `entity_type` selects the Recoverer and the expected attribute/parent shape.
/// - `parents` is keyed by parent-type name (`"Exchange"`, `"Queue"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    id: ObjectId,

    #[serde(rename = "type")]
    entity_type: EntityType,

    #[serde(default)]
    attributes: Map<String, Value>,

    #[serde(default)]
    parents: BTreeMap<EntityType, ParentRef>,
}

impl PersistedRecord {
    pub fn new(id: ObjectId, entity_type: EntityType) -> Self {
        Self {
            id,
            entity_type,
            attributes: Map::new(),
            parents: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_parent(mut self, parent: ParentRef) -> Self {
        self.parents.insert(parent.entity_type.clone(), parent);
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn parents(&self) -> &BTreeMap<EntityType, ParentRef> {
        &self.parents
    }

    pub fn parent(&self, entity_type: &EntityType) -> Option<&ParentRef> {
        self.parents.get(entity_type)
    }
}
