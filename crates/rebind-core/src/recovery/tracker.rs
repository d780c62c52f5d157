//! Dependency tracker for unresolved objects.
//!
//! Design:
//! - Parked objects live in a slab indexed by a ticket (registration order).
//! - Index: dependency id -> tickets waiting on it, in insertion order.
//! - Invariant: an id is in the index iff at least one parked object still
//!   waits on it. Dependencies on ids that are already live are satisfied at
//!   registration time and never indexed.
//! - Satisfaction propagates through a FIFO work queue, never by recursion,
//!   so a chain of N objects costs O(N) heap and constant stack.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::recoverer::{ResolveContext, UnresolvedObject};
use crate::domain::{Dependency, LiveObject, ObjectId, RecoveryError, RecoveryEvent};
use crate::ports::EventSink;

type Ticket = usize;

/// Where a wait ends. Objects on a cycle end at themselves.
#[derive(Debug, Clone, Copy)]
struct Terminal {
    id: ObjectId,
    on_cycle: bool,
}

pub struct DependencyTracker {
    /// Parked objects; `None` once resolved or failed.
    parked: Vec<Option<Box<dyn UnresolvedObject>>>,

    /// Dependency id -> tickets waiting on it.
    waiting: HashMap<ObjectId, Vec<Ticket>>,

    /// Record id -> ticket, for following dependency chains at drain time.
    by_record: HashMap<ObjectId, Ticket>,

    /// Record ids whose `resolve` has been invoked in this pass.
    attempted: HashSet<ObjectId>,

    resolution_order: Vec<ObjectId>,
    failures: Vec<RecoveryError>,
    sink: Arc<dyn EventSink>,
}

impl DependencyTracker {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            parked: Vec::new(),
            waiting: HashMap::new(),
            by_record: HashMap::new(),
            attempted: HashSet::new(),
            resolution_order: Vec::new(),
            failures: Vec::new(),
            sink,
        }
    }

    /// Register a freshly created unresolved object.
    ///
    /// Dependencies that are already live are satisfied on the spot; the
    /// object resolves immediately if nothing remains, otherwise it is parked
    /// under each missing id.
    ///
    /// Only `RecoveryInconsistency` is returned as `Err`; record-scoped
    /// failures are collected (see [`failures`](Self::failures)).
    pub fn register(
        &mut self,
        mut object: Box<dyn UnresolvedObject>,
        ctx: &mut ResolveContext<'_>,
    ) -> Result<(), RecoveryError> {
        let already_live: Vec<(ObjectId, LiveObject)> = unique_ids(object.as_ref())
            .into_iter()
            .filter_map(|id| ctx.graph.get(id).map(|live| (id, live.clone())))
            .collect();

        for (id, live) in already_live {
            match object.satisfy(id, &live) {
                Ok(satisfied) => self.emit_satisfied(object.id(), satisfied),
                Err(err) => return self.report_failure(err),
            }
        }

        if object.outstanding_dependencies().is_empty() {
            let mut work = VecDeque::new();
            if let Some(resolved) = self.resolve_one(object, ctx)? {
                work.push_back(resolved);
            }
            return self.propagate(work, ctx);
        }

        self.park(object);
        Ok(())
    }

    /// `id` became live as `live`: unblock everything waiting on it,
    /// transitively.
    pub fn satisfy(
        &mut self,
        id: ObjectId,
        live: LiveObject,
        ctx: &mut ResolveContext<'_>,
    ) -> Result<(), RecoveryError> {
        self.propagate(VecDeque::from([(id, live)]), ctx)
    }

    /// Collect a record-scoped failure.
    ///
    /// `RecoveryInconsistency` is handed back instead: it aborts the pass.
    pub fn report_failure(&mut self, err: RecoveryError) -> Result<(), RecoveryError> {
        if err.kind().is_always_fatal() {
            return Err(err);
        }
        let Some(entity_type) = err.entity_type().cloned() else {
            return Err(err);
        };
        self.sink.emit(RecoveryEvent::RecordFailed {
            id: err.record_id(),
            entity_type,
            kind: err.kind(),
            reason: err.to_string(),
        });
        self.failures.push(err);
        Ok(())
    }

    fn park(&mut self, object: Box<dyn UnresolvedObject>) {
        let ticket = self.parked.len();
        for id in unique_ids(object.as_ref()) {
            self.waiting.entry(id).or_default().push(ticket);
        }
        self.by_record.insert(object.id(), ticket);
        self.parked.push(Some(object));
    }

    fn propagate(
        &mut self,
        mut work: VecDeque<(ObjectId, LiveObject)>,
        ctx: &mut ResolveContext<'_>,
    ) -> Result<(), RecoveryError> {
        while let Some((id, live)) = work.pop_front() {
            let Some(tickets) = self.waiting.remove(&id) else {
                continue;
            };

            for ticket in tickets {
                let (owner, result, ready) = match self.parked[ticket].as_mut() {
                    Some(object) => {
                        let result = object.satisfy(id, &live);
                        let ready = object.outstanding_dependencies().is_empty();
                        (object.id(), result, ready)
                    }
                    None => continue,
                };

                match result {
                    Ok(satisfied) => self.emit_satisfied(owner, satisfied),
                    Err(err) => {
                        self.evict(ticket);
                        self.report_failure(err)?;
                        continue;
                    }
                }

                if ready {
                    if let Some(object) = self.take(ticket) {
                        if let Some(resolved) = self.resolve_one(object, ctx)? {
                            work.push_back(resolved);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_one(
        &mut self,
        object: Box<dyn UnresolvedObject>,
        ctx: &mut ResolveContext<'_>,
    ) -> Result<Option<(ObjectId, LiveObject)>, RecoveryError> {
        let id = object.id();
        let entity_type = object.entity_type();
        if !self.attempted.insert(id) {
            return Err(RecoveryError::inconsistency(
                id,
                "record resolved more than once in one pass",
            ));
        }

        match object.resolve(ctx) {
            Ok(live) => {
                ctx.graph.register(id, live.clone())?;
                self.resolution_order.push(id);
                self.sink.emit(RecoveryEvent::ObjectResolved {
                    id,
                    entity_type,
                    live_id: live.id(),
                });
                Ok(Some((id, live)))
            }
            Err(err) => {
                self.report_failure(err)?;
                Ok(None)
            }
        }
    }

    /// Remove a parked object that is ready to resolve. Its index entries are
    /// already gone: every id it waited on has been satisfied.
    fn take(&mut self, ticket: Ticket) -> Option<Box<dyn UnresolvedObject>> {
        let object = self.parked[ticket].take()?;
        self.by_record.remove(&object.id());
        Some(object)
    }

    /// Remove a parked object that failed, together with its index entries.
    fn evict(&mut self, ticket: Ticket) {
        let Some(object) = self.parked[ticket].take() else {
            return;
        };
        self.by_record.remove(&object.id());
        for id in unique_ids(object.as_ref()) {
            if let Some(tickets) = self.waiting.get_mut(&id) {
                tickets.retain(|t| *t != ticket);
                if tickets.is_empty() {
                    self.waiting.remove(&id);
                }
            }
        }
    }

    fn emit_satisfied(&self, owner: ObjectId, satisfied: Vec<Dependency>) {
        for dependency in satisfied {
            self.sink.emit(RecoveryEvent::DependencySatisfied {
                id: owner,
                dependency,
            });
        }
    }

    /// Objects still waiting, in registration order.
    pub fn remaining_unresolved(&self) -> impl Iterator<Item = &dyn UnresolvedObject> {
        self.parked.iter().filter_map(|slot| slot.as_deref())
    }

    /// Ids at least one parked object is waiting on.
    pub fn waiting_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.waiting.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn is_waiting_on(&self, id: ObjectId) -> bool {
        self.waiting.contains_key(&id)
    }

    /// One `UnresolvableDependency` per parked object.
    ///
    /// `chain` is `[owner, first id it waits on, terminal]`: the terminal is
    /// where following first outstanding dependencies ends, either an id no
    /// parked record provides or the first id of a cycle. It is omitted when
    /// it equals the first id. Terminals are computed once for all parked
    /// objects, so a broken chain of N records reports in O(N).
    pub fn unresolvable_reports(&self) -> Vec<RecoveryError> {
        let terminals = self.terminals();
        self.parked
            .iter()
            .enumerate()
            .filter_map(|(ticket, slot)| slot.as_deref().map(|object| (ticket, object)))
            .map(|(ticket, object)| {
                let mut chain = vec![object.id()];
                if let Some(first) = object.outstanding_dependencies().first() {
                    chain.push(first.id);
                    if let Some(terminal) = terminals.get(&ticket) {
                        let end = if terminal.on_cycle { object.id() } else { terminal.id };
                        if end != first.id {
                            chain.push(end);
                        }
                    }
                }
                RecoveryError::UnresolvableDependency {
                    id: object.id(),
                    entity_type: object.entity_type(),
                    missing: object.outstanding_dependencies().to_vec(),
                    chain,
                }
            })
            .collect()
    }

    /// Parked ticket the first outstanding dependency of `object` points at,
    /// or the dependency id when no parked record provides it.
    fn next_hop(&self, object: &dyn UnresolvedObject) -> Result<Ticket, ObjectId> {
        let Some(first) = object.outstanding_dependencies().first() else {
            return Err(object.id());
        };
        self.by_record
            .get(&first.id)
            .copied()
            .filter(|ticket| self.parked[*ticket].is_some())
            .ok_or(first.id)
    }

    /// Terminal of every parked ticket, each ticket visited once.
    fn terminals(&self) -> HashMap<Ticket, Terminal> {
        let mut done: HashMap<Ticket, Terminal> = HashMap::new();

        for start in 0..self.parked.len() {
            if self.parked[start].is_none() || done.contains_key(&start) {
                continue;
            }
            let mut path: Vec<(Ticket, ObjectId)> = Vec::new();
            let mut on_path: HashMap<Ticket, usize> = HashMap::new();
            let mut ticket = start;

            loop {
                let Some(object) = self.parked[ticket].as_deref() else {
                    break;
                };
                if let Some(&position) = on_path.get(&ticket) {
                    // path[position..] is a cycle; the rest of the path leads into it.
                    let entry = path[position].1;
                    for &(t, id) in &path[position..] {
                        done.insert(t, Terminal { id, on_cycle: true });
                    }
                    for &(t, _) in &path[..position] {
                        done.insert(t, Terminal { id: entry, on_cycle: false });
                    }
                    break;
                }
                if let Some(known) = done.get(&ticket).copied() {
                    let id = if known.on_cycle { object.id() } else { known.id };
                    for &(t, _) in &path {
                        done.insert(t, Terminal { id, on_cycle: false });
                    }
                    break;
                }

                on_path.insert(ticket, path.len());
                path.push((ticket, object.id()));
                match self.next_hop(object) {
                    Ok(next) => ticket = next,
                    Err(missing) => {
                        for &(t, _) in &path {
                            done.insert(t, Terminal { id: missing, on_cycle: false });
                        }
                        break;
                    }
                }
            }
        }
        done
    }

    /// Take every parked object out of the tracker and clear the index.
    pub fn drain(&mut self) -> Vec<Box<dyn UnresolvedObject>> {
        self.waiting.clear();
        self.by_record.clear();
        self.parked.drain(..).flatten().collect()
    }

    /// Record ids resolved so far, in resolution order.
    pub fn resolution_order(&self) -> &[ObjectId] {
        &self.resolution_order
    }

    pub fn failures(&self) -> &[RecoveryError] {
        &self.failures
    }

    pub fn into_parts(self) -> (Vec<ObjectId>, Vec<RecoveryError>) {
        (self.resolution_order, self.failures)
    }
}

fn unique_ids(object: &dyn UnresolvedObject) -> Vec<ObjectId> {
    let mut ids = Vec::new();
    for dependency in object.outstanding_dependencies() {
        if !ids.contains(&dependency.id) {
            ids.push(dependency.id);
        }
    }
    ids
}
