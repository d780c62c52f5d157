//! Events - 復元中に発生するイベント
//!
//! EventSink に渡される観測ポイントです。ビジネスロジックの途中で
//! 直接ログを書く代わりに、決まった地点でこのイベントを発行します。

use serde::Serialize;

use super::{Dependency, EntityType, ErrorKind, ObjectId, RecoveryPhase};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecoveryEvent {
    PhaseChanged {
        from: RecoveryPhase,
        to: RecoveryPhase,
    },

    /// A record was accepted by its recoverer and handed to the tracker.
    RecordAccepted {
        id: ObjectId,
        entity_type: EntityType,
        outstanding: usize,
    },

    /// A record id was already live; nothing was rebuilt.
    AlreadyLive { id: ObjectId, entity_type: EntityType },

    DependencySatisfied {
        id: ObjectId,
        dependency: Dependency,
    },

    /// An object became live. `live_id` differs from `id` when the record
    /// resolved to an equivalent object that already existed.
    ObjectResolved {
        id: ObjectId,
        entity_type: EntityType,
        live_id: ObjectId,
    },

    RecordFailed {
        id: ObjectId,
        entity_type: EntityType,
        kind: ErrorKind,
        reason: String,
    },

    /// A failure was tolerated under a skip policy.
    RecordSkipped {
        id: ObjectId,
        entity_type: EntityType,
        kind: ErrorKind,
    },
}
