//! RecoveryCoordinator: one pass from an unordered record stream to a linked
//! live graph.
//!
//! State machine: Init -> Streaming -> Draining -> {Complete | Failed}, plus
//! Streaming -> Cancelled (shutdown while consuming records).
//!
//! Record-scoped failures never stop the stream. Every record is read so
//! that every failure is reported; the policy decides at drain time whether
//! the collected failures fail the pass.
//!
//! A pass is single-threaded. The tracker is owned by the pass and every
//! register/satisfy/resolve call runs to completion before the next record
//! is read.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::recoverer::ResolveContext;
use super::registry::RecovererRegistry;
use super::tracker::DependencyTracker;
use crate::app::config::{FailurePolicy, RecoveryConfig};
use crate::domain::{
    ErrorKind, LiveGraph, LiveObject, ObjectId, PersistedRecord, RecoveryError, RecoveryEvent,
    RecoveryPhase, StartupError,
};
use crate::ports::{EventSink, ObjectFactory, RecordStore};

/// Result of one recovery pass. The live objects themselves are in the
/// graph the pass was run against.
#[derive(Debug)]
pub struct RecoveryOutcome {
    pub phase: RecoveryPhase,
    pub records_read: usize,

    /// Record ids that resolved, in resolution order.
    pub resolved: Vec<ObjectId>,

    /// Collected record-scoped failures (fatal or skipped, per policy).
    pub failures: Vec<RecoveryError>,
}

impl RecoveryOutcome {
    pub fn is_complete(&self) -> bool {
        self.phase == RecoveryPhase::Complete
    }

    pub fn failures_of(&self, kind: ErrorKind) -> impl Iterator<Item = &RecoveryError> {
        self.failures.iter().filter(move |f| f.kind() == kind)
    }
}

pub struct RecoveryCoordinator {
    registry: Arc<RecovererRegistry>,
    factory: Arc<dyn ObjectFactory>,
    sink: Arc<dyn EventSink>,
    config: RecoveryConfig,
    cancel: CancellationToken,
}

impl RecoveryCoordinator {
    pub fn new(
        registry: Arc<RecovererRegistry>,
        factory: Arc<dyn ObjectFactory>,
        sink: Arc<dyn EventSink>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            registry,
            factory,
            sink,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` to abandon passes (e.g. broker shutdown mid-recovery).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    pub fn registry(&self) -> &RecovererRegistry {
        &self.registry
    }

    /// Run one pass over `records` against `graph`.
    ///
    /// `Err` only for `RecoveryInconsistency`; everything record-scoped ends
    /// up in [`RecoveryOutcome::failures`].
    pub fn recover<I>(
        &self,
        graph: &mut LiveGraph,
        records: I,
    ) -> Result<RecoveryOutcome, RecoveryError>
    where
        I: IntoIterator<Item = PersistedRecord>,
    {
        let mut pass = RecoveryPass::new(self, graph);
        pass.transition(RecoveryPhase::Streaming);

        for record in records {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    records_read = pass.records_read,
                    "recovery cancelled, abandoning record stream"
                );
                pass.transition(RecoveryPhase::Cancelled);
                return Ok(pass.finish());
            }

            pass.stream(record)?;
            pass.settle(self.config.on_malformed);
        }

        pass.transition(RecoveryPhase::Draining);
        pass.drain()?;
        Ok(pass.finish())
    }

    /// List every record from `store` and recover them.
    pub async fn recover_from_store(
        &self,
        store: &dyn RecordStore,
        graph: &mut LiveGraph,
    ) -> Result<RecoveryOutcome, StartupError> {
        let records = store.list_records().await?;
        tracing::info!(records = records.len(), "starting recovery");
        Ok(self.recover(graph, records)?)
    }
}

/// State of one pass.
struct RecoveryPass<'a> {
    coordinator: &'a RecoveryCoordinator,
    graph: &'a mut LiveGraph,
    tracker: DependencyTracker,
    phase: RecoveryPhase,
    seen: HashSet<ObjectId>,
    records_read: usize,

    /// Failures already judged against the policy.
    settled: usize,

    /// A failure was collected under the abort policy.
    escalated: bool,
}

impl<'a> RecoveryPass<'a> {
    fn new(coordinator: &'a RecoveryCoordinator, graph: &'a mut LiveGraph) -> Self {
        Self {
            coordinator,
            graph,
            tracker: DependencyTracker::new(coordinator.sink.clone()),
            phase: RecoveryPhase::Init,
            seen: HashSet::new(),
            records_read: 0,
            settled: 0,
            escalated: false,
        }
    }

    fn transition(&mut self, next: RecoveryPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal recovery transition {:?} -> {:?}",
            self.phase,
            next
        );
        self.coordinator.sink.emit(RecoveryEvent::PhaseChanged {
            from: self.phase,
            to: next,
        });
        self.phase = next;
    }

    fn stream(&mut self, record: PersistedRecord) -> Result<(), RecoveryError> {
        self.records_read += 1;
        let id = record.id();
        let entity_type = record.entity_type().clone();

        if !self.seen.insert(id) {
            return self.tracker.report_failure(RecoveryError::malformed(
                id,
                &entity_type,
                "duplicate record id in store",
            ));
        }

        if let Some(existing) = self.graph.get(id).cloned() {
            return self.already_live(id, existing, &record);
        }

        let Some(recoverer) = self.coordinator.registry.get(&entity_type) else {
            return self
                .tracker
                .report_failure(RecoveryError::UnknownType { id, entity_type });
        };

        let object = match recoverer.create_unresolved_object(&record, &*self.graph) {
            Ok(object) => object,
            Err(err) => return self.tracker.report_failure(err),
        };

        self.coordinator.sink.emit(RecoveryEvent::RecordAccepted {
            id,
            entity_type,
            outstanding: object.outstanding_dependencies().len(),
        });
        let mut ctx = ResolveContext::new(&mut *self.graph, self.coordinator.factory.as_ref());
        self.tracker.register(object, &mut ctx)
    }

    /// The record's id is already live: nothing is rebuilt, but objects
    /// waiting on the id are released.
    fn already_live(
        &mut self,
        id: ObjectId,
        existing: LiveObject,
        record: &PersistedRecord,
    ) -> Result<(), RecoveryError> {
        if &existing.entity_type() != record.entity_type() {
            return self.tracker.report_failure(RecoveryError::malformed(
                id,
                record.entity_type(),
                format!(
                    "id is already live as {} '{}'",
                    existing.entity_type(),
                    existing.name()
                ),
            ));
        }

        self.coordinator.sink.emit(RecoveryEvent::AlreadyLive {
            id,
            entity_type: record.entity_type().clone(),
        });
        let mut ctx = ResolveContext::new(&mut *self.graph, self.coordinator.factory.as_ref());
        self.tracker.satisfy(id, existing, &mut ctx)
    }

    /// Judge failures collected since the last call against `policy`.
    fn settle(&mut self, policy: FailurePolicy) {
        let fresh = &self.tracker.failures()[self.settled..];
        self.settled += fresh.len();
        if fresh.is_empty() {
            return;
        }

        match policy {
            FailurePolicy::Abort => {
                if !self.escalated {
                    tracing::error!(
                        failures = fresh.len(),
                        "record failure under abort policy, recovery will fail"
                    );
                }
                self.escalated = true;
            }
            FailurePolicy::Skip => {
                for event in fresh.iter().filter_map(skipped) {
                    self.coordinator.sink.emit(event);
                }
            }
        }
    }

    fn drain(&mut self) -> Result<(), RecoveryError> {
        // Ids can become live outside the tracker (aliases, factory defaults).
        let live_now: Vec<(ObjectId, LiveObject)> = self
            .tracker
            .waiting_ids()
            .into_iter()
            .filter_map(|id| self.graph.get(id).map(|live| (id, live.clone())))
            .collect();
        for (id, live) in live_now {
            let mut ctx =
                ResolveContext::new(&mut *self.graph, self.coordinator.factory.as_ref());
            self.tracker.satisfy(id, live, &mut ctx)?;
        }
        self.settle(self.coordinator.config.on_malformed);

        let reports = self.tracker.unresolvable_reports();
        self.tracker.drain();
        for report in reports {
            self.tracker.report_failure(report)?;
        }
        self.settle(self.coordinator.config.on_unresolved);

        if self.escalated {
            self.transition(RecoveryPhase::Failed);
        } else {
            self.transition(RecoveryPhase::Complete);
        }
        Ok(())
    }

    fn finish(self) -> RecoveryOutcome {
        let (resolved, failures) = self.tracker.into_parts();
        RecoveryOutcome {
            phase: self.phase,
            records_read: self.records_read,
            resolved,
            failures,
        }
    }
}

fn skipped(failure: &RecoveryError) -> Option<RecoveryEvent> {
    failure
        .entity_type()
        .map(|entity_type| RecoveryEvent::RecordSkipped {
            id: failure.record_id(),
            entity_type: entity_type.clone(),
            kind: failure.kind(),
        })
}
