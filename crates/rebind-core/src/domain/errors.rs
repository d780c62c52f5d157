//! Errors - エラー型と分類
//!
//! # 分類
//! - MalformedRecord / UnknownType: レコード単位の失敗（収集して続行可能）
//! - UnresolvableDependency: drain 時にのみ判定できる失敗（収集）
//! - RecoveryInconsistency: 内部不変条件の違反（常に致命的、パスを即中断）

use serde::Serialize;

use super::{Dependency, EntityType, ObjectId};
use crate::ports::StoreError;

/// ErrorKind は失敗の運用上の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedRecord,
    UnknownType,
    UnresolvableDependency,
    RecoveryInconsistency,
}

impl ErrorKind {
    /// 常にパスを中断するか（ポリシーに関係なく）
    pub fn is_always_fatal(self) -> bool {
        matches!(self, ErrorKind::RecoveryInconsistency)
    }
}

/// RecoveryError は復元パスのエラー
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryError {
    #[error("malformed {entity_type} record {id}: {reason}")]
    MalformedRecord {
        id: ObjectId,
        entity_type: EntityType,
        reason: String,
    },

    #[error("no recoverer registered for type '{entity_type}' (record {id})")]
    UnknownType { id: ObjectId, entity_type: EntityType },

    #[error(
        "{entity_type} record {id} can never resolve: missing [{}] via chain [{}]",
        join(.missing),
        join(.chain)
    )]
    UnresolvableDependency {
        id: ObjectId,
        entity_type: EntityType,
        missing: Vec<Dependency>,
        chain: Vec<ObjectId>,
    },

    #[error("recovery inconsistency on record {id}: {detail}")]
    RecoveryInconsistency { id: ObjectId, detail: String },
}

impl RecoveryError {
    pub fn malformed(id: ObjectId, entity_type: &EntityType, reason: impl Into<String>) -> Self {
        RecoveryError::MalformedRecord {
            id,
            entity_type: entity_type.clone(),
            reason: reason.into(),
        }
    }

    pub fn inconsistency(id: ObjectId, detail: impl Into<String>) -> Self {
        RecoveryError::RecoveryInconsistency {
            id,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RecoveryError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            RecoveryError::UnknownType { .. } => ErrorKind::UnknownType,
            RecoveryError::UnresolvableDependency { .. } => ErrorKind::UnresolvableDependency,
            RecoveryError::RecoveryInconsistency { .. } => ErrorKind::RecoveryInconsistency,
        }
    }

    /// Entity type of the failing record; `None` for internal inconsistencies.
    pub fn entity_type(&self) -> Option<&EntityType> {
        match self {
            RecoveryError::MalformedRecord { entity_type, .. }
            | RecoveryError::UnknownType { entity_type, .. }
            | RecoveryError::UnresolvableDependency { entity_type, .. } => Some(entity_type),
            RecoveryError::RecoveryInconsistency { .. } => None,
        }
    }

    /// The record this failure is scoped to.
    pub fn record_id(&self) -> ObjectId {
        match self {
            RecoveryError::MalformedRecord { id, .. }
            | RecoveryError::UnknownType { id, .. }
            | RecoveryError::UnresolvableDependency { id, .. }
            | RecoveryError::RecoveryInconsistency { id, .. } => *id,
        }
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// StartupError はストアからの復元全体のエラー
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),
}
