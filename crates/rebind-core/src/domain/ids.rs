//! Object identifiers.
//!
//! # ULID ベースの ID
//! 永続化レコードと live object は同じ `ObjectId` で識別されます。
//! ストアから読み戻した後も変わらないため、プロセス再起動をまたいで安定です。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: timestamp が先頭にあるため、生成順序でソートできる
//! - **分散生成可能**: 調整なしで複数ノードで生成できる
//! - **UUID互換**: 128-bit で UUID と同じサイズ

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Identifier of a configured object (record id == live object id).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Ulid);

impl ObjectId {
    /// ULID から ObjectId を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// 数値から ObjectId を作成（テストや固定 ID 用）
    pub fn from_u128(value: u128) -> Self {
        Self(Ulid(value))
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for ObjectId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ObjectId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_as_plain_ulid() {
        let ulid = Ulid::new();
        let id = ObjectId::from_ulid(ulid);
        assert_eq!(id.to_string(), ulid.to_string());
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn ids_parse_back_from_display() {
        let id = ObjectId::from_ulid(Ulid::new());
        let parsed: ObjectId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!("not-a-ulid".parse::<ObjectId>().is_err());
    }

    #[test]
    fn ids_serialize_as_string() {
        let id = ObjectId::from_u128(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));

        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ulid_ids_are_sortable() {
        let id1 = ObjectId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = ObjectId::from_ulid(Ulid::new());

        assert!(id1 < id2);
    }
}
