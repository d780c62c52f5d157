//! EntityType - 永続化レコードの型タグ
//!
//! レコードの `type` がどの Recoverer で処理されるか、
//! どの親参照・属性の形が期待されるかを決めます。

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Entity-type tag of a configured object (`"Exchange"`, `"Queue"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(Cow<'static, str>);

impl EntityType {
    pub const EXCHANGE: EntityType = EntityType(Cow::Borrowed("Exchange"));
    pub const QUEUE: EntityType = EntityType(Cow::Borrowed("Queue"));
    pub const BINDING: EntityType = EntityType(Cow::Borrowed("Binding"));

    pub fn new(s: impl Into<String>) -> Self {
        Self(Cow::Owned(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EntityType {
    fn from(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrowed_and_owned_tags_compare_equal() {
        assert_eq!(EntityType::new("Queue"), EntityType::QUEUE);
        assert_ne!(EntityType::new("queue"), EntityType::QUEUE);
    }

    #[test]
    fn deserializes_from_plain_string() {
        let t: EntityType = serde_json::from_str("\"Binding\"").unwrap();
        assert_eq!(t, EntityType::BINDING);
    }
}
