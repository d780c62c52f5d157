//! Attribute extraction with `MalformedRecord` errors carrying record context.

use serde_json::{Map, Value};

use crate::domain::{EntityType, ObjectId, PersistedRecord, RecoveryError};

pub struct Attributes<'r> {
    record: &'r PersistedRecord,
}

impl<'r> Attributes<'r> {
    pub fn of(record: &'r PersistedRecord) -> Self {
        Self { record }
    }

    fn malformed(&self, reason: String) -> RecoveryError {
        RecoveryError::malformed(self.record.id(), self.record.entity_type(), reason)
    }

    pub fn required_str(&self, name: &str) -> Result<String, RecoveryError> {
        match self.record.attribute(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.malformed(format!(
                "attribute '{name}' must be a string, got {other}"
            ))),
            None => Err(self.malformed(format!("required attribute '{name}' is missing"))),
        }
    }

    /// Booleans are accepted both as JSON booleans and as "true"/"false".
    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, RecoveryError> {
        match self.record.attribute(name) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
            Some(other) => Err(self.malformed(format!(
                "attribute '{name}' must be a boolean, got {other}"
            ))),
        }
    }

    pub fn map_or_empty(&self, name: &str) -> Result<Map<String, Value>, RecoveryError> {
        match self.record.attribute(name) {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(other) => Err(self.malformed(format!(
                "attribute '{name}' must be a map, got {other}"
            ))),
        }
    }

    /// An optional reference to another record, stored as an id string.
    pub fn optional_id(&self, name: &str) -> Result<Option<ObjectId>, RecoveryError> {
        match self.record.attribute(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => s.parse().map(Some).map_err(|e| {
                self.malformed(format!("attribute '{name}' is not a valid id '{s}': {e}"))
            }),
            Some(other) => Err(self.malformed(format!(
                "attribute '{name}' must be an id string, got {other}"
            ))),
        }
    }

    /// Id of the required parent of `entity_type`.
    pub fn required_parent(&self, entity_type: &EntityType) -> Result<ObjectId, RecoveryError> {
        let parent = self
            .record
            .parent(entity_type)
            .ok_or_else(|| self.malformed(format!("required parent {entity_type} is missing")))?;
        if &parent.entity_type != entity_type {
            return Err(self.malformed(format!(
                "parent {entity_type} refers to a {} record",
                parent.entity_type
            )));
        }
        Ok(parent.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParentRef;
    use serde_json::json;

    fn record() -> PersistedRecord {
        PersistedRecord::new(ObjectId::from_u128(1), EntityType::QUEUE)
    }

    #[test]
    fn required_string_must_exist_and_be_a_string() {
        let r = record().with_attribute("name", json!(5));
        let attrs = Attributes::of(&r);

        assert!(matches!(
            attrs.required_str("name"),
            Err(RecoveryError::MalformedRecord { ref reason, .. }) if reason.contains("must be a string")
        ));
        assert!(matches!(
            attrs.required_str("missing"),
            Err(RecoveryError::MalformedRecord { ref reason, .. }) if reason.contains("missing")
        ));
    }

    #[test]
    fn booleans_accept_strings() {
        let r = record()
            .with_attribute("durable", "FALSE")
            .with_attribute("exclusive", json!(1));
        let attrs = Attributes::of(&r);

        assert!(!attrs.bool_or("durable", true).unwrap());
        assert!(attrs.bool_or("autoDelete", true).unwrap());
        assert!(attrs.bool_or("exclusive", false).is_err());
    }

    #[test]
    fn optional_id_parses_ulids() {
        let alt = ObjectId::from_u128(77);
        let r = record()
            .with_attribute("alternateExchange", alt.to_string())
            .with_attribute("broken", "nope");
        let attrs = Attributes::of(&r);

        assert_eq!(attrs.optional_id("alternateExchange").unwrap(), Some(alt));
        assert_eq!(attrs.optional_id("absent").unwrap(), None);
        assert!(attrs.optional_id("broken").is_err());
    }

    #[test]
    fn parent_type_must_match_its_key() {
        let r = PersistedRecord::new(ObjectId::from_u128(1), EntityType::BINDING).with_parent(
            ParentRef::new(ObjectId::from_u128(2), EntityType::EXCHANGE),
        );
        let attrs = Attributes::of(&r);

        assert_eq!(
            attrs.required_parent(&EntityType::EXCHANGE).unwrap(),
            ObjectId::from_u128(2)
        );
        assert!(attrs.required_parent(&EntityType::QUEUE).is_err());
    }
}
