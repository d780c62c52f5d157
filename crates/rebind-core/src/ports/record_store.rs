//! RecordStore port - 永続化レイヤーとの境界
//!
//! ストアは現在のスナップショットの全レコードを返します。
//! 順序は保証されず、エンジンは順序に依存してはいけません。
//!
//! # 実装
//! - InMemoryRecordStore（テスト・組み込み用）
//! - JsonFileRecordStore（JSON 配列ファイル）

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::PersistedRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read record store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode record store {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// RecordStore は永続化されたレコードの供給元
///
/// I/O はここで完結し、復元アルゴリズム自体には suspension point がありません。
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_records(&self) -> Result<Vec<PersistedRecord>, StoreError>;
}
