//! EventSink の実装

use std::sync::Mutex;

use crate::domain::RecoveryEvent;
use crate::ports::EventSink;

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: RecoveryEvent) {}
}

/// TracingEventSink は復元イベントを `tracing` に流す
///
/// # レベル
/// - phase 遷移 / レコード受理 / 解決: info
/// - 依存の充足 / 既に live: debug
/// - 失敗 / skip: warn
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: RecoveryEvent) {
        match event {
            RecoveryEvent::PhaseChanged { from, to } => {
                tracing::info!(?from, ?to, "recovery phase changed");
            }
            RecoveryEvent::RecordAccepted {
                id,
                entity_type,
                outstanding,
            } => {
                tracing::info!(%id, %entity_type, outstanding, "record accepted");
            }
            RecoveryEvent::AlreadyLive { id, entity_type } => {
                tracing::debug!(%id, %entity_type, "record already live");
            }
            RecoveryEvent::DependencySatisfied { id, dependency } => {
                tracing::debug!(%id, %dependency, "dependency satisfied");
            }
            RecoveryEvent::ObjectResolved {
                id,
                entity_type,
                live_id,
            } => {
                tracing::info!(%id, %entity_type, %live_id, "object resolved");
            }
            RecoveryEvent::RecordFailed {
                id,
                entity_type,
                kind,
                reason,
            } => {
                tracing::warn!(%id, %entity_type, ?kind, %reason, "record failed");
            }
            RecoveryEvent::RecordSkipped {
                id,
                entity_type,
                kind,
            } => {
                tracing::warn!(%id, %entity_type, ?kind, "record skipped");
            }
        }
    }
}

/// テスト用: 受け取ったイベントを順に保持する
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<RecoveryEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<RecoveryEvent> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecoveryEvent>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: RecoveryEvent) {
        self.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityType, ObjectId, RecoveryPhase};

    #[test]
    fn memory_sink_keeps_emission_order() {
        let sink = MemoryEventSink::new();
        sink.emit(RecoveryEvent::PhaseChanged {
            from: RecoveryPhase::Init,
            to: RecoveryPhase::Streaming,
        });
        sink.emit(RecoveryEvent::AlreadyLive {
            id: ObjectId::from_u128(1),
            entity_type: EntityType::QUEUE,
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], RecoveryEvent::PhaseChanged { .. }));

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn tracing_sink_accepts_every_event() {
        let sink = TracingEventSink;
        sink.emit(RecoveryEvent::RecordSkipped {
            id: ObjectId::from_u128(1),
            entity_type: EntityType::BINDING,
            kind: crate::domain::ErrorKind::UnknownType,
        });
    }
}
