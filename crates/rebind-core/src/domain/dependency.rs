use serde::{Deserialize, Serialize};
use std::fmt;

use super::{EntityType, ObjectId};

/// A reference to a live object that is not available yet.
///
/// `name` is the role the reference plays for its owner
/// (`"exchange"`, `"queue"`, `"alternateExchange"`), used in reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
}

impl Dependency {
    pub fn new(id: ObjectId, entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            id,
            entity_type,
            name: name.into(),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}={}", self.entity_type, self.name, self.id)
    }
}
