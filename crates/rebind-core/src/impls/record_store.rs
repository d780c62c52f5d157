//! RecordStore の実装
//!
//! - **InMemoryRecordStore**: テスト・組み込み用
//! - **JsonFileRecordStore**: レコードの JSON 配列を 1 ファイルから読む

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::PersistedRecord;
use crate::ports::{RecordStore, StoreError};

/// Records held in memory, returned in insertion order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    records: Vec<PersistedRecord>,
}

impl InMemoryRecordStore {
    pub fn new(records: Vec<PersistedRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: PersistedRecord) {
        self.records.push(record);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_records(&self) -> Result<Vec<PersistedRecord>, StoreError> {
        Ok(self.records.clone())
    }
}

/// JSON ファイル上のレコードストア
///
/// # フォーマット
/// ```json
/// [
///   { "id": "01J...", "type": "Queue", "attributes": { "name": "orders" } },
///   { "id": "01J...", "type": "Binding", "attributes": { "name": "orders" },
///     "parents": { "Exchange": { "id": "01J...", "type": "Exchange" },
///                  "Queue": { "id": "01J...", "type": "Queue" } } }
/// ]
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileRecordStore {
    path: PathBuf,
}

impl JsonFileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordStore for JsonFileRecordStore {
    async fn list_records(&self) -> Result<Vec<PersistedRecord>, StoreError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        let records: Vec<PersistedRecord> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "record store loaded");
        Ok(records)
    }
}
